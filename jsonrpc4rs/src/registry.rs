// registry.rs
//
// The service registry (spec §3 "Service registry"). Go reflects over a
// registered object's exported methods to find ones matching
// `(paramsPtr, resultPtr) -> error`; Rust has no such reflection, so a
// service is instead assembled explicitly with `ServiceBuilder`, and each
// method closure performs the exact same `(params) -> Result<result,
// error>` contract the spec describes. The registry itself — a
// process-global, read-mostly map keyed by service name, with
// load-or-store semantics on registration — is unchanged.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock, RwLock};

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::wire::coerce::{self, ParamSpec};
use crate::wire::method::snake_to_pascal;

/// The error a registered method can return. `InvalidParams` originates
/// from coercion inside the generated invoker; `Internal` is whatever
/// error the method body itself returned (spec: "a non-nil returned error
/// -> -32603 Internal error; original error logged, not propagated").
#[derive(Debug)]
pub enum MethodError {
    InvalidParams(String),
    Internal(String),
}

impl<E: std::error::Error> From<E> for MethodError {
    fn from(e: E) -> Self {
        MethodError::Internal(e.to_string())
    }
}

pub type MethodFuture = Pin<Box<dyn Future<Output = std::result::Result<Value, MethodError>> + Send>>;
pub type CoerceFn = Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;
pub type InvokeFn = Arc<dyn Fn(Value) -> MethodFuture + Send + Sync>;

/// A registered method, split into its two call-time phases so the
/// dispatcher can run the before-hook between them (spec §4.2 orders
/// parameter coercion, step 5, ahead of the before-hook, step 7):
/// `coerce` alone does the object/array matching against the params
/// struct's field list; `invoke` takes the already-normalized params and
/// runs the method body.
#[derive(Clone)]
pub struct MethodHandler {
    pub coerce: CoerceFn,
    pub invoke: InvokeFn,
}

pub struct Service {
    pub name: String,
    methods: HashMap<String, MethodHandler>,
}

impl Service {
    pub fn method(&self, name: &str) -> Option<&MethodHandler> {
        self.methods.get(name)
    }
}

pub struct ServiceBuilder<S> {
    name: String,
    target: Arc<S>,
    methods: HashMap<String, MethodHandler>,
}

impl<S: Send + Sync + 'static> ServiceBuilder<S> {
    pub fn new(name: impl Into<String>, target: S) -> Self {
        Self {
            name: name.into(),
            target: Arc::new(target),
            methods: HashMap::new(),
        }
    }

    /// Register one method. `f` receives the shared target and the
    /// coerced params and returns the result, matching the
    /// `(paramsPtr, resultPtr) -> error` contract of spec §3 with the
    /// out-parameter turned into a plain return value.
    pub fn method<P, R, F, Fut>(mut self, name: &str, f: F) -> Self
    where
        P: ParamSpec + Send + 'static,
        R: Serialize + 'static,
        F: Fn(Arc<S>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, MethodError>> + Send + 'static,
    {
        let coerce: CoerceFn = Arc::new(|params: &Value| coerce::normalize::<P>(params));

        let target = self.target.clone();
        let f = Arc::new(f);
        let invoke: InvokeFn = Arc::new(move |normalized: Value| {
            let target = target.clone();
            let f = f.clone();
            let fut = async move {
                let parsed: P = serde_json::from_value(normalized)
                    .map_err(|e| MethodError::InvalidParams(e.to_string()))?;
                let result = f(target, parsed).await?;
                serde_json::to_value(result)
                    .map_err(|e| MethodError::Internal(e.to_string()))
            };
            Box::pin(fut)
        });
        self.methods.insert(name.to_string(), MethodHandler { coerce, invoke });
        self
    }

    pub fn build(self) -> Service {
        Service {
            name: self.name,
            methods: self.methods,
        }
    }
}

type Registry = RwLock<HashMap<String, Arc<Service>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a service. Fails with `ServiceAlreadyDefined` if the name
/// collides with an existing registration (spec: "Re-registering a
/// service name fails").
pub fn register(service: Service) -> Result<()> {
    let mut map = registry().write().expect("registry lock poisoned");
    if map.contains_key(&service.name) {
        return Err(Error::ServiceAlreadyDefined(service.name));
    }
    map.insert(service.name.clone(), Arc::new(service));
    Ok(())
}

/// Look up a service by wire name, falling back to the snake_case ->
/// PascalCase transform (spec: "support HelloWorld and hello_world").
pub fn lookup(name: &str) -> Option<Arc<Service>> {
    let map = registry().read().expect("registry lock poisoned");
    if let Some(s) = map.get(name) {
        return Some(s.clone());
    }
    map.get(&snake_to_pascal(name)).cloned()
}

/// Snapshot of every currently registered service name, consumed by the
/// server-side discovery registration loop (spec §4.6).
pub fn registered_service_names() -> Vec<String> {
    registry().read().expect("registry lock poisoned").keys().cloned().collect()
}

/// Test-only: removes a service so repeated test runs sharing the global
/// registry don't collide on re-registration.
#[cfg(test)]
pub fn deregister(name: &str) {
    registry().write().expect("registry lock poisoned").remove(name);
}

#[cfg(test)]
mod registry_tests {
    use super::*;
    use crate::param_spec;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct AddParams {
        a: i64,
        b: i64,
    }
    param_spec!(AddParams { a, b });

    struct IntRpc;

    fn build_int_rpc() -> Service {
        ServiceBuilder::new("IntRpc", IntRpc)
            .method("Add", |_target: Arc<IntRpc>, p: AddParams| async move {
                std::result::Result::<i64, MethodError>::Ok(p.a + p.b)
            })
            .build()
    }

    #[test]
    fn duplicate_registration_fails() {
        deregister("IntRpcDup");
        let mut svc = build_int_rpc();
        svc.name = "IntRpcDup".to_string();
        register(svc).unwrap();

        let mut svc2 = build_int_rpc();
        svc2.name = "IntRpcDup".to_string();
        let err = register(svc2).unwrap_err();
        assert!(matches!(err, Error::ServiceAlreadyDefined(_)));
        deregister("IntRpcDup");
    }

    #[test]
    fn snake_case_fallback_resolves() {
        deregister("HelloWorld");
        let svc = ServiceBuilder::<()>::new("HelloWorld", ()).build();
        register(svc).unwrap();
        assert!(lookup("hello_world").is_some());
        deregister("HelloWorld");
    }
}
