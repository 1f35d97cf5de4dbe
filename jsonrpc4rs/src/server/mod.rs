// mod.rs
//
// The server half of the public API (spec §6): `new_server(protocol,
// port)` plus the `Server` type wrapping the dispatcher, hooks, rate
// limiter, and optional discovery registration loop. Method names mirror
// the Go interface (`Server.Register`, `SetOptions`, `SetDiscovery`,
// `SetRateLimit`, `SetBeforeFunc`, `SetAfterFunc`, `Start`, `GetEvent`).

pub mod event;
pub mod http;
pub mod options;
pub mod tcp;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::dispatch::Dispatcher;
use crate::discovery::{Driver, REGISTRY_RETRY_INTERVAL_SECS};
use crate::error::{Error, Result};
use crate::hooks::Hooks;
use crate::net::detect_hostname;
use crate::rate_limit::RateLimiter;
use crate::registry;

use event::{create_event_channel, EventReceiver};
use http::HttpServer;
use options::{HttpServerOptions, TcpServerOptions};
use tcp::TcpServer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
    Tcp,
}

impl Protocol {
    pub fn wire_name(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Tcp => "tcp",
        }
    }
}

struct DiscoveryConfig {
    driver: Arc<dyn Driver>,
    hostname: Option<String>,
}

pub struct Server {
    protocol: Protocol,
    port: u16,
    hooks: Hooks,
    rate_limiter: Option<Arc<RateLimiter>>,
    tcp_options: TcpServerOptions,
    http_options: HttpServerOptions,
    discovery: Option<DiscoveryConfig>,
    event_tx: event::EventSender,
    event_rx: Option<EventReceiver>,
}

impl Server {
    fn new(protocol: Protocol, port: u16) -> Self {
        let (event_tx, event_rx) = create_event_channel();
        Self {
            protocol,
            port,
            hooks: Hooks::default(),
            rate_limiter: None,
            tcp_options: TcpServerOptions::default(),
            http_options: HttpServerOptions::default(),
            discovery: None,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Register a service into the process-global registry (spec §5:
    /// "many servers in a test may share one registry").
    pub fn register(&self, service: registry::Service) -> Result<()> {
        registry::register(service)
    }

    pub fn set_tcp_options(&mut self, options: TcpServerOptions) {
        self.tcp_options = options;
    }

    pub fn set_http_options(&mut self, options: HttpServerOptions) {
        self.http_options = options;
    }

    pub fn set_discovery(&mut self, driver: Arc<dyn Driver>, hostname: Option<String>) {
        self.discovery = Some(DiscoveryConfig { driver, hostname });
    }

    pub fn set_rate_limit(&mut self, rate: f64, burst: u64) {
        self.rate_limiter = Some(Arc::new(RateLimiter::new(rate, burst)));
    }

    pub fn set_before_func<F>(&mut self, f: F)
    where
        F: Fn(Option<&str>, &str, &Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.hooks = std::mem::take(&mut self.hooks).with_before(f);
    }

    pub fn set_after_func<F>(&mut self, f: F)
    where
        F: Fn(Option<&str>, &str, &Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.hooks = std::mem::take(&mut self.hooks).with_after(f);
    }

    pub fn get_event(&mut self) -> EventReceiver {
        self.event_rx.take().expect("GetEvent called more than once")
    }

    pub async fn start(&self) -> Result<()> {
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_hooks(self.hooks.clone());
        if let Some(limiter) = &self.rate_limiter {
            dispatcher.set_rate_limiter(Arc::clone(limiter));
        }
        let dispatcher = Arc::new(dispatcher);

        if let Some(discovery) = &self.discovery {
            self.spawn_registration_loop(discovery);
        }

        match self.protocol {
            Protocol::Tcp => {
                let mut server = TcpServer::new(self.port, dispatcher);
                server.set_options(self.tcp_options.clone());
                server.start(self.event_tx.clone()).await
            }
            Protocol::Http | Protocol::Https => {
                let mut server = HttpServer::new(self.port, dispatcher);
                server.set_options(self.http_options.clone());
                server.start(self.event_tx.clone()).await
            }
        }
    }

    /// For each registered service, spawn a task that retries `Register`
    /// indefinitely on failure with a fixed backoff (spec §4.6).
    fn spawn_registration_loop(&self, discovery: &DiscoveryConfig) {
        let hostname = match &discovery.hostname {
            Some(h) => h.clone(),
            None => match detect_hostname() {
                Ok(h) => h,
                Err(e) => {
                    tracing::error!("hostname autodetection failed: {}", e);
                    return;
                }
            },
        };
        let driver = Arc::clone(&discovery.driver);
        let protocol = self.protocol.wire_name();
        let port = self.port;
        for name in registry::registered_service_names() {
            let driver = Arc::clone(&driver);
            let hostname = hostname.clone();
            tokio::spawn(async move {
                loop {
                    match driver.register(&name, protocol, &hostname, port).await {
                        Ok(()) => break,
                        Err(e) => {
                            tracing::warn!("discovery registration for {} failed: {}", name, e);
                            tokio::time::sleep(Duration::from_secs(REGISTRY_RETRY_INTERVAL_SECS)).await;
                        }
                    }
                }
            });
        }
    }
}

pub fn new_server(protocol: &str, port: u16) -> Result<Server> {
    let protocol = match protocol {
        "http" => Protocol::Http,
        "https" => Protocol::Https,
        "tcp" => Protocol::Tcp,
        other => return Err(Error::UnsupportedProtocol(other.to_string())),
    };
    Ok(Server::new(protocol, port))
}
