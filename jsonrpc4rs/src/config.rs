// config.rs
//
// CLI configuration for the two demo binaries, following gpop's
// `clap::Parser` + `#[arg(env)]` style (`daemon/src/main.rs`) so options
// can be set by flag or environment variable interchangeably.

use clap::Parser;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

#[derive(Parser, Debug)]
#[command(name = "jsonrpc4rs-server")]
#[command(version)]
#[command(about = "jsonrpc4rs demo server")]
pub struct ServerArgs {
    /// Bind address
    #[arg(short, long, env = "JSONRPC4RS_BIND", default_value = DEFAULT_BIND_ADDRESS)]
    pub bind: String,

    /// Listen port
    #[arg(short, long, env = "JSONRPC4RS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Service discovery driver: "static", "consul", "etcd", "nacos"
    #[arg(long, env = "JSONRPC4RS_DISCOVERY", default_value = "static")]
    pub discovery: String,

    /// Discovery backend URL (ignored for "static")
    #[arg(long, env = "JSONRPC4RS_DISCOVERY_URL")]
    pub discovery_url: Option<String>,

    /// Requests per second allowed before rate limiting kicks in; 0 disables it
    #[arg(long, env = "JSONRPC4RS_RATE", default_value_t = 0.0)]
    pub rate: f64,

    /// Token bucket burst size for rate limiting
    #[arg(long, env = "JSONRPC4RS_BURST", default_value_t = 0)]
    pub burst: u64,

    /// TLS certificate path (HTTPS only)
    #[arg(long, env = "JSONRPC4RS_TLS_CERT")]
    pub tls_cert: Option<String>,

    /// TLS private key path (HTTPS only)
    #[arg(long, env = "JSONRPC4RS_TLS_KEY")]
    pub tls_key: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "jsonrpc4rs-client")]
#[command(version)]
#[command(about = "jsonrpc4rs demo client")]
pub struct ClientArgs {
    /// Service name to call
    #[arg(short, long, env = "JSONRPC4RS_SERVICE", default_value = "Calculator")]
    pub service: String,

    /// Transport protocol: "tcp", "http", "https"
    #[arg(long, env = "JSONRPC4RS_PROTOCOL", default_value = "tcp")]
    pub protocol: String,

    /// Comma-separated server address list
    #[arg(short, long, env = "JSONRPC4RS_ADDRESS", default_value = "127.0.0.1:8080")]
    pub address: String,
}
