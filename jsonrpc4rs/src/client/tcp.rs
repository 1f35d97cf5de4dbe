// tcp.rs
//
// Pool-backed TCP client (spec §4.4). `call` encodes the request, borrows
// a connection, writes; on write failure it rotates to a fresh connection
// via `Pool::borrow_after_remove` and retries exactly once before giving
// up. Batch accumulates requests and dispatches the decoded array
// response back onto each element by position.

use serde_json::Value;
use tokio::sync::Mutex;

use super::framing::{read_frame, write_frame, FramingOptions};
use super::pool::{Pool, PooledConnection};
use super::Client;
use crate::error::{Error, Result};
use crate::wire::request;
use crate::wire::Response;

struct PendingRequest {
    method: String,
    params: Value,
    is_notify: bool,
}

pub struct TcpClient {
    pool: Pool,
    framing: FramingOptions,
    pending: Mutex<Vec<PendingRequest>>,
}

impl TcpClient {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            framing: FramingOptions::default(),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn set_framing(&mut self, framing: FramingOptions) {
        self.framing = framing;
    }

    async fn write_and_read(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let mut conn = self.pool.borrow().await?;
        if let Err(first_err) = self.write_once(&mut conn, &body).await {
            tracing::debug!("tcp write failed, rotating connection: {}", first_err);
            conn = self.pool.borrow_after_remove(conn).await?;
            self.write_once(&mut conn, &body).await?;
        }
        let frame = read_frame(&mut conn.stream, &self.framing).await;
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                self.pool.remove(conn).await;
                return Err(e);
            }
        };
        let response = match frame {
            Some(response) => response,
            None => {
                self.pool.remove(conn).await;
                return Err(Error::Wire("connection closed before a response frame arrived".to_string()));
            }
        };
        self.pool.release(conn).await;
        Ok(response)
    }

    async fn write_once(&self, conn: &mut PooledConnection, body: &[u8]) -> Result<()> {
        write_frame(&mut conn.stream, &self.framing, body).await
    }
}

#[async_trait::async_trait]
impl Client for TcpClient {
    async fn call(&self, method: &str, params: Value, is_notify: bool) -> Result<Value> {
        let id = if is_notify { None } else { Some(next_id()) };
        let body = request::encode(id, method, params);
        let response_bytes = self.write_and_read(body).await?;
        let response: Response = serde_json::from_slice(&response_bytes)?;
        decode_response(response)
    }

    async fn batch_append(&self, method: &str, params: Value, is_notify: bool) -> usize {
        let mut pending = self.pending.lock().await;
        pending.push(PendingRequest {
            method: method.to_string(),
            params,
            is_notify,
        });
        pending.len() - 1
    }

    async fn batch_call(&self) -> Result<Vec<std::result::Result<Value, String>>> {
        let mut pending = self.pending.lock().await;
        let requests: Vec<request::Request> = pending
            .drain(..)
            .map(|p| {
                let id = if p.is_notify { None } else { Some(next_id()) };
                request::Request::new(id, p.method, p.params)
            })
            .collect();
        drop(pending);
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let body = request::encode_batch(&requests);
        let response_bytes = self.write_and_read(body).await?;
        let responses: Vec<Response> = serde_json::from_slice(&response_bytes)?;
        Ok(responses.into_iter().map(|r| decode_response(r).map_err(|e| e.to_string())).collect())
    }
}

fn decode_response(response: Response) -> Result<Value> {
    match response {
        Response::Success { result, .. } => Ok(result),
        Response::Error { error, .. } => Err(Error::Wire(error.message)),
    }
}

fn next_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
