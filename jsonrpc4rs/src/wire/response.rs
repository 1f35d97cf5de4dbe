// response.rs
//
// JSON-RPC 2.0 response objects: success or error, both optionally keyed
// by the request id (absent for responses to notifications — the
// dispatcher still produces one, but the caller has nothing to correlate
// it against).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::codes::{self, CUSTOM_ERROR};
use super::request::JSONRPC_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        jsonrpc: String,
        result: Value,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        jsonrpc: String,
        error: ErrorObject,
    },
}

impl Response {
    pub fn success(id: Option<String>, result: Value) -> Self {
        Response::Success {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            result,
        }
    }

    /// Build an error response from one of the standard wire codes
    /// (§3 error table). Never pass `CUSTOM_ERROR` here — use
    /// `custom_error` so the message carries the caller's own text.
    pub fn from_code(id: Option<String>, code: i32) -> Self {
        Response::Error {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            error: ErrorObject {
                code,
                message: codes::message_for(code).to_string(),
                data: None,
            },
        }
    }

    /// Build a custom error response (`-32000`) with an arbitrary message:
    /// hook rejections, rate-limit denial, user-defined errors.
    pub fn custom_error(id: Option<String>, message: impl Into<String>) -> Self {
        Response::Error {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            error: ErrorObject {
                code: CUSTOM_ERROR,
                message: message.into(),
                data: None,
            },
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Response::Success { id, .. } => id.as_deref(),
            Response::Error { id, .. } => id.as_deref(),
        }
    }

    pub fn into_error_message(self) -> Option<String> {
        match self {
            Response::Error { error, .. } => Some(error.message),
            Response::Success { .. } => None,
        }
    }

    pub fn into_result(self) -> Option<Value> {
        match self {
            Response::Success { result, .. } => Some(result),
            Response::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use crate::wire::codes::METHOD_NOT_FOUND;

    #[test]
    fn success_round_trips() {
        let resp = Response::success(Some("1".into()), serde_json::json!(3));
        let bytes = serde_json::to_vec(&resp).unwrap();
        let decoded: Response = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.id(), Some("1"));
        assert_eq!(decoded.into_result(), Some(serde_json::json!(3)));
    }

    #[test]
    fn error_carries_canonical_message() {
        let resp = Response::from_code(Some("1".into()), METHOD_NOT_FOUND);
        match &resp {
            Response::Error { error, .. } => {
                assert_eq!(error.code, METHOD_NOT_FOUND);
                assert_eq!(error.message, "Method not found");
            }
            _ => panic!("expected error response"),
        }
    }

    #[test]
    fn notification_response_omits_id() {
        let resp = Response::success(None, Value::Null);
        let text = serde_json::to_string(&resp).unwrap();
        assert!(!text.contains("\"id\""));
    }
}
