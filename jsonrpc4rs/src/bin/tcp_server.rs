// tcp_server.rs
//
// Demo TCP JSON-RPC server, following gpop's `main.rs` shape: parse args,
// init tracing, build the thing, run until Ctrl+C.

use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jsonrpc4rs::config::ServerArgs;
use jsonrpc4rs::discovery::{Consul, Etcd, Nacos};
use jsonrpc4rs::registry::{MethodError, ServiceBuilder};
use jsonrpc4rs::{new_server, param_spec};

struct Calculator;

#[derive(Debug, Deserialize)]
struct AddParams {
    a: f64,
    b: f64,
}
param_spec!(AddParams { a, b });

#[derive(Debug, Deserialize)]
struct SubParams {
    a: f64,
    b: f64,
}
param_spec!(SubParams { a, b });

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("jsonrpc4rs=info".parse().unwrap()),
        )
        .init();

    let args = ServerArgs::parse();

    let calculator = ServiceBuilder::new("Calculator", Calculator)
        .method("Add", |_target: Arc<Calculator>, p: AddParams| async move {
            std::result::Result::<f64, MethodError>::Ok(p.a + p.b)
        })
        .method("Sub", |_target: Arc<Calculator>, p: SubParams| async move {
            std::result::Result::<f64, MethodError>::Ok(p.a - p.b)
        })
        .build();

    let mut server = new_server("tcp", args.port)?;
    server.register(calculator)?;

    if args.rate > 0.0 && args.burst > 0 {
        server.set_rate_limit(args.rate, args.burst);
    }

    match args.discovery.as_str() {
        "static" => {}
        "consul" => {
            let url = args.discovery_url.as_deref().unwrap_or("http://127.0.0.1:8500");
            server.set_discovery(Arc::new(Consul::new(url)?), None);
        }
        "etcd" => {
            let endpoint = args.discovery_url.as_deref().unwrap_or("http://127.0.0.1:2379");
            server.set_discovery(Arc::new(Etcd::new(endpoint)?), None);
        }
        "nacos" => {
            let url = args.discovery_url.as_deref().unwrap_or("http://127.0.0.1:8848");
            server.set_discovery(Arc::new(Nacos::new(url)?), None);
        }
        other => {
            error!("unknown discovery driver: {}", other);
            std::process::exit(1);
        }
    }

    info!("jsonrpc4rs TCP server listening on {}:{}", args.bind, args.port);

    let mut event_rx = server.get_event();
    tokio::spawn(async move {
        if event_rx.recv().await.is_some() {
            info!("server ready");
        }
    });

    tokio::select! {
        result = server.start() => {
            if let Err(e) = result {
                error!("server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
