// hooks.rs
//
// Before/after hooks (spec §4.2). Configured process-wide per server
// instance. A non-nil return from either hook short-circuits the request
// to a custom (`-32000`) error carrying the hook's message verbatim. Fires
// even for notifications (spec §9 Open Questions).

use std::sync::Arc;

use serde_json::Value;

pub type BeforeHook = Arc<dyn Fn(Option<&str>, &str, &Value) -> Result<(), String> + Send + Sync>;
pub type AfterHook = Arc<dyn Fn(Option<&str>, &str, &Value) -> Result<(), String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Hooks {
    pub before: Option<BeforeHook>,
    pub after: Option<AfterHook>,
}

impl Hooks {
    pub fn with_before<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&str>, &str, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(f));
        self
    }

    pub fn with_after<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&str>, &str, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(f));
        self
    }
}
