// mod.rs
//
// The client half of the public API (spec §6): `new_client(serviceName,
// protocol, addressOrDriver)` plus the `Client` trait both transports
// implement. Returned as a trait object since the concrete transport is
// picked at runtime from the `protocol` string, matching the Go
// interface-returning factory.

pub mod balance;
pub mod framing;
pub mod http;
pub mod pool;
pub mod tcp;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::discovery::Driver;
use crate::error::{Error, Result};

use http::HttpClient;
use pool::{Pool, PoolOptions};
use tcp::TcpClient;

#[async_trait::async_trait]
pub trait Client: Send + Sync {
    /// Send a request and await its response. `is_notify` skips the id,
    /// so the server never replies and this returns `Value::Null`.
    async fn call(&self, method: &str, params: Value, is_notify: bool) -> Result<Value>;

    /// Queue a call for the next `batch_call`, returning its position in
    /// the pending batch.
    async fn batch_append(&self, method: &str, params: Value, is_notify: bool) -> usize;

    /// Flush the pending batch in one round trip. Each slot holds either
    /// the decoded result or the wire error message for that element,
    /// matching the per-element error semantics of spec §4.2.
    async fn batch_call(&self) -> Result<Vec<std::result::Result<Value, String>>>;
}

/// Either a bare comma-separated address list or a discovery driver to
/// resolve one from, per spec §6's `NewClient(serviceName, protocol,
/// addressOrDriver)`.
pub enum AddressSource {
    Static(String),
    Discovery(Arc<dyn Driver>),
}

#[derive(Default)]
pub struct ClientOptions {
    pub pool: PoolOptions,
    pub ca_path: Option<std::path::PathBuf>,
}

pub async fn new_client(
    service_name: impl Into<String>,
    protocol: &str,
    address_or_driver: AddressSource,
    options: ClientOptions,
) -> Result<Box<dyn Client>> {
    let service_name = service_name.into();
    match protocol {
        "tcp" => {
            let (discovery, static_address) = match address_or_driver {
                AddressSource::Static(addr) => (None, Some(addr)),
                AddressSource::Discovery(driver) => (Some(driver), None),
            };
            let pool = Pool::new(service_name, discovery, static_address, options.pool).await?;
            Ok(Box::new(TcpClient::new(pool)))
        }
        "http" | "https" => {
            let (discovery, static_address) = match address_or_driver {
                AddressSource::Static(addr) => (None, Some(addr)),
                AddressSource::Discovery(driver) => (Some(driver), None),
            };
            let ca_path: Option<&Path> = options.ca_path.as_deref();
            let client =
                HttpClient::new(service_name, protocol, discovery, static_address, ca_path).await?;
            Ok(Box::new(client))
        }
        other => Err(Error::UnsupportedProtocol(other.to_string())),
    }
}
