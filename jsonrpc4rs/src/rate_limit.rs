// rate_limit.rs
//
// Token-bucket admission control keyed per server (spec §4.7). The Go
// original pairs a ticker goroutine with a buffered channel standing in
// for the bucket; per the design notes ("prefer a single task that does
// both"), this is one `tokio` task owning an atomic token count.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct RateLimiter {
    tokens: Arc<AtomicU64>,
    burst: u64,
}

impl RateLimiter {
    /// `rate` tokens are added per second (fractional rates refill less
    /// than once per second), up to `burst`. A zero rate or burst leaves
    /// the limiter permanently empty — every call is denied, mirroring
    /// `SetRateLimit` never being called meaning "unconfigured" is handled
    /// one level up, by not constructing a `RateLimiter` at all.
    pub fn new(rate: f64, burst: u64) -> Self {
        let tokens = Arc::new(AtomicU64::new(burst));
        if rate > 0.0 && burst > 0 {
            let tokens_for_task = tokens.clone();
            let interval = Duration::from_secs_f64(1.0 / rate);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await; // first tick fires immediately
                loop {
                    ticker.tick().await;
                    let _ = tokens_for_task.fetch_update(
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                        |t| if t < burst { Some(t + 1) } else { None },
                    );
                }
            });
        }
        Self { tokens, burst }
    }

    /// Non-blocking admission check: returns whether a token was
    /// available. When unconfigured (no `RateLimiter` at all), the
    /// dispatcher admits unconditionally rather than calling this.
    pub fn allow(&self) -> bool {
        self.tokens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                if t > 0 {
                    Some(t - 1)
                } else {
                    None
                }
            })
            .is_ok()
    }

    pub fn burst(&self) -> u64 {
        self.burst
    }
}
