// pool.rs
//
// Bounded pool of TCP connections with dial-failure address eviction
// (spec §4.3). Per-client state (unlike the process-global service
// registry).
//
// The pool mutex guards `active_total` and `active_address_list`; the
// conns queue is a bounded channel whose own synchronization is
// independent of that mutex, so a blocking dequeue in `borrow` never
// holds the state lock across the await point.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

use crate::discovery::Driver;
use crate::error::{Error, Result};

pub struct PooledConnection {
    pub stream: TcpStream,
    pub address: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub min_idle: usize,
    pub max_active: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            min_idle: 1,
            max_active: 8,
        }
    }
}

struct PoolState {
    active_address_list: Vec<String>,
    active_total: usize,
    options: PoolOptions,
}

pub struct Pool {
    name: String,
    discovery: Option<Arc<dyn Driver>>,
    static_address: Option<String>,
    state: Mutex<PoolState>,
    conns_tx: mpsc::Sender<PooledConnection>,
    conns_rx: Mutex<mpsc::Receiver<PooledConnection>>,
}

impl Pool {
    /// Resolve the initial address list (discovery driver, else the
    /// static comma-separated address string) and dial `min_idle`
    /// connections up front; dial failures during init are swallowed but
    /// still evict the failing address, matching spec §4.3.
    pub async fn new(
        name: impl Into<String>,
        discovery: Option<Arc<dyn Driver>>,
        static_address: Option<String>,
        options: PoolOptions,
    ) -> Result<Self> {
        let name = name.into();
        let active_address_list = if let Some(driver) = &discovery {
            driver
                .get(&name)
                .await?
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            static_address
                .clone()
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        let (conns_tx, conns_rx) = mpsc::channel(options.max_active.max(1));
        let pool = Self {
            name,
            discovery,
            static_address,
            state: Mutex::new(PoolState {
                active_address_list,
                active_total: 0,
                options,
            }),
            conns_tx,
            conns_rx: Mutex::new(conns_rx),
        };

        for _ in 0..options.min_idle {
            let mut state = pool.state.lock().await;
            match dial_next(&mut state).await {
                Ok(conn) => {
                    state.active_total += 1;
                    drop(state);
                    let _ = pool.conns_tx.try_send(conn);
                }
                Err(e) => {
                    tracing::debug!("pool {}: initial dial failed: {}", pool.name, e);
                }
            }
        }
        Ok(pool)
    }

    /// `activeTotal == 0` fails immediately; `activeTotal >= maxActive`
    /// dequeues from the bounded queue (may suspend); otherwise dials a
    /// fresh connection and returns it directly, without enqueuing it
    /// (spec §9 Open Questions: "created connections are not queued
    /// until first Release").
    pub async fn borrow(&self) -> Result<PooledConnection> {
        let mut state = self.state.lock().await;
        if state.active_total == 0 && state.active_address_list.is_empty() {
            return Err(Error::PoolExhausted);
        }
        if state.active_total >= state.options.max_active {
            drop(state);
            let mut rx = self.conns_rx.lock().await;
            return rx.recv().await.ok_or(Error::PoolExhausted);
        }
        let conn = dial_next(&mut state).await?;
        state.active_total += 1;
        Ok(conn)
    }

    pub async fn release(&self, conn: PooledConnection) {
        let _ = self.conns_tx.try_send(conn);
    }

    /// Used after a write fails: drop the dead connection, decrement
    /// `active_total`, and dial a replacement.
    pub async fn borrow_after_remove(&self, dead: PooledConnection) -> Result<PooledConnection> {
        drop(dead);
        let mut state = self.state.lock().await;
        state.active_total = state.active_total.saturating_sub(1);
        let conn = dial_next(&mut state).await?;
        state.active_total += 1;
        Ok(conn)
    }

    /// Used after a read fails with no replacement needed: drop the dead
    /// connection and decrement `active_total` without dialing. Every
    /// connection taken out of circulation must go through this,
    /// `release`, or `borrow_after_remove` — a bare drop leaks the count
    /// and eventually wedges `borrow` against `max_active` forever.
    pub async fn remove(&self, dead: PooledConnection) {
        drop(dead);
        let mut state = self.state.lock().await;
        state.active_total = state.active_total.saturating_sub(1);
    }

    pub async fn set_options(&self, options: PoolOptions) {
        self.state.lock().await.options = options;
    }

    pub async fn active_total(&self) -> usize {
        self.state.lock().await.active_total
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Pick `key = activeTotal mod |activeAddressList|`, dial it. On dial
/// failure, splice the address out of `activeAddressList` and return the
/// error; the caller does not touch `active_total` on failure.
async fn dial_next(state: &mut PoolState) -> Result<PooledConnection> {
    if state.active_address_list.is_empty() {
        return Err(Error::PoolExhausted);
    }
    let key = state.active_total % state.active_address_list.len();
    let address = state.active_address_list[key].clone();
    match TcpStream::connect(&address).await {
        Ok(stream) => Ok(PooledConnection { stream, address }),
        Err(e) => {
            state.active_address_list.remove(key);
            Err(Error::Io(e))
        }
    }
}
