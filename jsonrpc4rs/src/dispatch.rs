// dispatch.rs
//
// The reflective dispatcher's call-time behavior (spec §4.2), minus the
// reflection itself (handled at registration time by `registry`). `handle`
// is the transport-agnostic entry point both the HTTP and TCP servers call
// with the raw request body; `single_handle` is the per-request pipeline.

use std::sync::Arc;

use serde_json::Value;

use crate::hooks::Hooks;
use crate::rate_limit::RateLimiter;
use crate::registry::{self, MethodError};
use crate::wire::{codes, method, request, Response};

#[derive(Clone, Default)]
pub struct Dispatcher {
    hooks: Hooks,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hooks(&mut self, hooks: Hooks) {
        self.hooks = hooks;
    }

    pub fn set_rate_limiter(&mut self, limiter: Arc<RateLimiter>) {
        self.rate_limiter = Some(limiter);
    }

    /// Top-level entry point: decode bytes, route single vs batch, encode
    /// the response(s). A batch's responses preserve request order.
    pub async fn handle(&self, bytes: &[u8]) -> Vec<u8> {
        let value: Value = match serde_json::from_slice(bytes) {
            Ok(v) => v,
            Err(_) => {
                return encode_one(&Response::from_code(None, codes::PARSE_ERROR));
            }
        };
        match value {
            Value::Array(items) => {
                let mut responses = Vec::with_capacity(items.len());
                for item in items {
                    responses.push(self.single_handle(item).await);
                }
                serde_json::to_vec(&responses).expect("response batch serialization is infallible")
            }
            Value::Object(_) => encode_one(&self.single_handle(value).await),
            _ => encode_one(&Response::from_code(None, codes::INVALID_REQUEST)),
        }
    }

    /// The single-request pipeline (spec §4.2, steps 1-10). Notifications
    /// still produce a response object here; the server always replies.
    pub async fn single_handle(&self, value: Value) -> Response {
        let map = match value {
            Value::Object(m) => m,
            _ => return Response::from_code(None, codes::INVALID_REQUEST),
        };

        let req = match request::parse_single_request_body(map) {
            Some(r) => r,
            None => return Response::from_code(None, codes::INVALID_REQUEST),
        };
        let id = req.id.clone();

        if let Some(limiter) = &self.rate_limiter {
            if !limiter.allow() {
                return Response::custom_error(id, "Too many requests");
            }
        }

        let (service_name, method_name) = match method::parse_request_method(&req.method) {
            Ok(parts) => parts,
            Err(_) => return Response::from_code(id, codes::METHOD_NOT_FOUND),
        };

        let service = match registry::lookup(&service_name) {
            Some(s) => s,
            None => return Response::from_code(id, codes::METHOD_NOT_FOUND),
        };

        let handler = match service.method(&method_name) {
            Some(m) => m.clone(),
            None => return Response::from_code(id, codes::METHOD_NOT_FOUND),
        };

        let normalized = match (handler.coerce)(&req.params) {
            Ok(v) => v,
            Err(msg) => {
                tracing::debug!("invalid params for {}: {}", method_name, msg);
                return Response::from_code(id, codes::INVALID_PARAMS);
            }
        };

        if let Some(before) = &self.hooks.before {
            if let Err(message) = before(id.as_deref(), &method_name, &normalized) {
                return Response::custom_error(id, message);
            }
        }

        let outcome = (handler.invoke)(normalized).await;
        let result = match outcome {
            Ok(v) => v,
            Err(MethodError::InvalidParams(msg)) => {
                tracing::debug!("invalid params for {}: {}", method_name, msg);
                return Response::from_code(id, codes::INVALID_PARAMS);
            }
            Err(MethodError::Internal(msg)) => {
                tracing::error!("method {} returned an error: {}", method_name, msg);
                return Response::from_code(id, codes::INTERNAL_ERROR);
            }
        };

        if let Some(after) = &self.hooks.after {
            if let Err(message) = after(id.as_deref(), &method_name, &result) {
                return Response::custom_error(id, message);
            }
        }

        Response::success(id, result)
    }
}

fn encode_one(response: &Response) -> Vec<u8> {
    serde_json::to_vec(response).expect("response serialization is infallible")
}

#[cfg(test)]
mod dispatch_tests {
    use super::*;
    use crate::param_spec;
    use crate::registry::{register, ServiceBuilder};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct AddParams {
        a: i64,
        b: i64,
    }
    param_spec!(AddParams { a, b });

    struct IntRpc;

    fn register_int_rpc(name: &str) {
        let svc = ServiceBuilder::new(name, IntRpc)
            .method("Add", |_t: Arc<IntRpc>, p: AddParams| async move {
                std::result::Result::<i64, MethodError>::Ok(p.a + p.b)
            })
            .build();
        let _ = register(svc);
    }

    #[tokio::test]
    async fn add_over_single_handle() {
        register_int_rpc("IntRpcDispatchA");
        let dispatcher = Dispatcher::new();
        let req = json!({"id": "1", "jsonrpc": "2.0", "method": "IntRpcDispatchA/Add", "params": {"a": 1, "b": 2}});
        let resp = dispatcher.single_handle(req).await;
        assert_eq!(resp.into_result(), Some(json!(3)));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        register_int_rpc("IntRpcDispatchB");
        let dispatcher = Dispatcher::new();
        let req = json!({"id": "1", "jsonrpc": "2.0", "method": "IntRpcDispatchB/Add1", "params": {"a": 1, "b": 6}});
        let resp = dispatcher.single_handle(req).await;
        assert_eq!(resp.into_error_message(), Some("Method not found".to_string()));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        register_int_rpc("IntRpcDispatchC");
        let dispatcher = Dispatcher::new();
        let batch = json!([
            {"id": "1", "jsonrpc": "2.0", "method": "IntRpcDispatchC/Add1", "params": [1, 6]},
            {"id": "2", "jsonrpc": "2.0", "method": "IntRpcDispatchC/Add", "params": [2, 3]},
        ]);
        let bytes = serde_json::to_vec(&batch).unwrap();
        let response_bytes = dispatcher.handle(&bytes).await;
        let responses: Vec<Response> = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].id(), Some("1"));
        assert!(responses[0].clone().into_error_message().is_some());
        assert_eq!(responses[1].clone().into_result(), Some(json!(5)));
    }

    #[tokio::test]
    async fn before_hook_rejection_short_circuits() {
        register_int_rpc("IntRpcDispatchD");
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_hooks(Hooks::default().with_before(|_, _, _| Err("Custom Error".to_string())));
        let req = json!({"id": "1", "jsonrpc": "2.0", "method": "IntRpcDispatchD/Add", "params": {"a": 1, "b": 2}});
        let resp = dispatcher.single_handle(req).await;
        assert_eq!(resp.into_error_message(), Some("Custom Error".to_string()));
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let dispatcher = Dispatcher::new();
        let bytes = dispatcher.handle(b"{not json").await;
        let resp: Response = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(resp.into_error_message(), Some("Parse error".to_string()));
    }
}
