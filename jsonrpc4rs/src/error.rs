// error.rs
//
// Crate-wide error taxonomy. This is distinct from the wire error codes in
// `wire::codes`: this enum is never serialized onto the wire, it is the
// `Result` type returned to Rust callers (transport failures, pool
// exhaustion, discovery failures, registration conflicts).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("rpc: service already defined: {0}")]
    ServiceAlreadyDefined(String),

    #[error("rpc: method request ill-formed: {0}; need x.y or x/y")]
    MalformedMethod(String),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("hook rejected request: {0}")]
    HookRejected(String),

    #[error("the protocol can not be supported: {0}")]
    UnsupportedProtocol(String),

    #[error("unable to connect")]
    PoolExhausted,

    #[error("discovery driver error: {0}")]
    Discovery(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gRPC transport error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("gRPC transport error: {0}")]
    GrpcTransport(#[from] tonic::transport::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Wire(String),
}

pub type Result<T> = std::result::Result<T, Error>;
