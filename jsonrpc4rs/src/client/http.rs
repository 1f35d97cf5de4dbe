// http.rs
//
// HTTP/HTTPS client (spec §4.5): one POST per call or batch, address
// picked by power-of-two-choices, refreshed from discovery when the
// resolved list runs dry. TLS with a custom CA bundle is supported via a
// `reqwest::Certificate` loaded once at construction time.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::Mutex;

use super::balance::{build_address_list, pick_power_of_two, AddressLoad};
use super::Client;
use crate::discovery::Driver;
use crate::error::{Error, Result};
use crate::wire::request;
use crate::wire::Response;

struct PendingRequest {
    method: String,
    params: Value,
    is_notify: bool,
}

pub struct HttpClient {
    service_name: String,
    protocol: String,
    discovery: Option<Arc<dyn Driver>>,
    addresses: RwLock<Vec<AddressLoad>>,
    http: reqwest::Client,
    pending: Mutex<Vec<PendingRequest>>,
}

impl HttpClient {
    pub async fn new(
        service_name: impl Into<String>,
        protocol: &str,
        discovery: Option<Arc<dyn Driver>>,
        static_address: Option<String>,
        ca_path: Option<&Path>,
    ) -> Result<Self> {
        let service_name = service_name.into();
        let addresses = resolve_addresses(&service_name, &discovery, &static_address).await?;

        let mut builder = reqwest::Client::builder();
        if let Some(ca_path) = ca_path {
            let pem = tokio::fs::read(ca_path).await?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(Error::Http)?;
            builder = builder.add_root_certificate(cert);
        }

        Ok(Self {
            service_name,
            protocol: protocol.to_string(),
            discovery,
            addresses: RwLock::new(build_address_list(&addresses)),
            http: builder.build().map_err(Error::Http)?,
            pending: Mutex::new(Vec::new()),
        })
    }

    async fn pick_address(&self) -> Result<String> {
        {
            let addresses = self.addresses.read().expect("address list lock poisoned");
            if let Some(chosen) = pick_power_of_two(&addresses) {
                return Ok(chosen.address.clone());
            }
        }
        let refreshed = resolve_addresses(&self.service_name, &self.discovery, &None).await?;
        let mut addresses = self.addresses.write().expect("address list lock poisoned");
        *addresses = build_address_list(&refreshed);
        pick_power_of_two(&addresses)
            .map(|a| a.address.clone())
            .ok_or_else(|| Error::Discovery(format!("no addresses available for {}", self.service_name)))
    }

    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let address = self.pick_address().await?;
        let url = format!("{}://{}", self.protocol, address);
        let resp = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

async fn resolve_addresses(
    service_name: &str,
    discovery: &Option<Arc<dyn Driver>>,
    static_address: &Option<String>,
) -> Result<Vec<String>> {
    let raw = if let Some(driver) = discovery {
        driver.get(service_name).await?
    } else {
        static_address.clone().unwrap_or_default()
    };
    Ok(raw.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
}

#[async_trait::async_trait]
impl Client for HttpClient {
    async fn call(&self, method: &str, params: Value, is_notify: bool) -> Result<Value> {
        let id = if is_notify { None } else { Some(next_id()) };
        let body = request::encode(id, method, params);
        let response_bytes = self.post(body).await?;
        let response: Response = serde_json::from_slice(&response_bytes)?;
        decode_response(response)
    }

    async fn batch_append(&self, method: &str, params: Value, is_notify: bool) -> usize {
        let mut pending = self.pending.lock().await;
        pending.push(PendingRequest {
            method: method.to_string(),
            params,
            is_notify,
        });
        pending.len() - 1
    }

    async fn batch_call(&self) -> Result<Vec<std::result::Result<Value, String>>> {
        let mut pending = self.pending.lock().await;
        let requests: Vec<request::Request> = pending
            .drain(..)
            .map(|p| {
                let id = if p.is_notify { None } else { Some(next_id()) };
                request::Request::new(id, p.method, p.params)
            })
            .collect();
        drop(pending);
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let body = request::encode_batch(&requests);
        let response_bytes = self.post(body).await?;
        let responses: Vec<Response> = serde_json::from_slice(&response_bytes)?;
        Ok(responses.into_iter().map(|r| decode_response(r).map_err(|e| e.to_string())).collect())
    }
}

fn decode_response(response: Response) -> Result<Value> {
    match response {
        Response::Success { result, .. } => Ok(result),
        Response::Error { error, .. } => Err(Error::Wire(error.message)),
    }
}

fn next_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
