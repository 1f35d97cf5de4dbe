// options.rs
//
// Typed per-transport server options (spec §9 DESIGN NOTES: "stringly-
// typed configuration... re-architects cleanly as a per-transport typed
// options builder"). Replaces the Go `SetOptions(any)` + type assertion
// with one options type per transport, set via `Server::set_options`.

use std::path::PathBuf;

use crate::client::framing::FramingOptions;

#[derive(Debug, Clone, Default)]
pub struct TcpServerOptions {
    pub framing: FramingOptions,
}

#[derive(Debug, Clone)]
pub struct TlsOptions {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct HttpServerOptions {
    pub tls: Option<TlsOptions>,
}
