// lib.rs

pub mod client;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod net;
pub mod rate_limit;
pub mod registry;
pub mod server;
pub mod wire;

pub use client::{new_client, AddressSource, Client, ClientOptions};
pub use error::{Error, Result};
pub use registry::{MethodError, Service, ServiceBuilder};
pub use server::{new_server, Server};
