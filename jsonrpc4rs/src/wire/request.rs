// request.rs
//
// JSON-RPC 2.0 request object. A single Rust type stands in for the Go
// implementation's `Request`/`NotifyRequest` pair: `id: None` is the
// notification case. This keeps both shapes round-trip-compatible with
// the wire (notifications simply omit the `id` field) without needing two
// structs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

fn default_jsonrpc_version() -> String {
    JSONRPC_VERSION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default = "default_jsonrpc_version")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: Option<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Fields retained by the wire filter. Anything else present on an
/// incoming request object is dropped before strict-shape decoding.
const REQUIRED_FIELDS: [&str; 4] = ["id", "jsonrpc", "method", "params"];

/// Filter unknown fields from a raw JSON object, retaining only the keys
/// the wire format recognizes. Idempotent: `filter(filter(x)) == filter(x)`.
pub fn filter_request_body(mut map: Map<String, Value>) -> Map<String, Value> {
    map.retain(|k, _| REQUIRED_FIELDS.contains(&k.as_str()));
    map
}

/// Parse a single request object: filters unknown fields, then decodes
/// into `Request`. A decode failure (e.g. missing `method`) is reported as
/// `None` so the caller can respond with `INVALID_REQUEST`.
pub fn parse_single_request_body(map: Map<String, Value>) -> Option<Request> {
    let filtered = filter_request_body(map);
    serde_json::from_value(Value::Object(filtered)).ok()
}

/// Encode a single request or notification to JSON bytes.
pub fn encode(id: Option<String>, method: &str, params: Value) -> Vec<u8> {
    let req = Request::new(id, method, params);
    serde_json::to_vec(&req).expect("Request serialization is infallible")
}

/// Encode a batch of requests, in order.
pub fn encode_batch(requests: &[Request]) -> Vec<u8> {
    serde_json::to_vec(requests).expect("batch serialization is infallible")
}

#[cfg(test)]
mod request_tests {
    use super::*;

    #[test]
    fn notification_round_trips_without_id_field() {
        let bytes = encode(None, "foo.bar", serde_json::json!({"a": 1}));
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("\"id\""));
        let decoded: Request = serde_json::from_str(&text).unwrap();
        assert!(decoded.is_notification());
        assert_eq!(decoded.method, "foo.bar");
    }

    #[test]
    fn request_round_trips_with_id() {
        let bytes = encode(Some("42".into()), "foo.bar", Value::Null);
        let decoded: Request = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.id.as_deref(), Some("42"));
        assert_eq!(decoded.jsonrpc, JSONRPC_VERSION);
    }

    #[test]
    fn filter_is_idempotent() {
        let mut map = Map::new();
        map.insert("id".into(), Value::String("1".into()));
        map.insert("method".into(), Value::String("a.b".into()));
        map.insert("bogus".into(), Value::Bool(true));
        let once = filter_request_body(map.clone());
        let twice = filter_request_body(once.clone());
        assert_eq!(once, twice);
        assert!(!once.contains_key("bogus"));
    }

    #[test]
    fn missing_method_fails_to_parse() {
        let mut map = Map::new();
        map.insert("id".into(), Value::String("1".into()));
        assert!(parse_single_request_body(map).is_none());
    }
}
