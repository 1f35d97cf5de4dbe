// tcp.rs
//
// TCP transport server (spec §4.4): one task per accepted connection,
// looping read-frame -> dispatch -> write-frame until the peer sends a
// clean zero-byte EOF. A non-EOF read error is logged and the loop
// continues, matching a goroutine-per-connection model that only ends
// on a clean close. Accept errors are fatal, matching `listener.Accept()`
// failures terminating the server loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use super::event::{signal_ready, EventSender};
use super::options::TcpServerOptions;
use crate::client::framing::{read_frame, write_frame, FramingOptions};
use crate::dispatch::Dispatcher;
use crate::error::Result;

pub struct TcpServer {
    port: u16,
    dispatcher: Arc<Dispatcher>,
    framing: FramingOptions,
}

impl TcpServer {
    pub fn new(port: u16, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            port,
            dispatcher,
            framing: FramingOptions::default(),
        }
    }

    pub fn set_options(&mut self, options: TcpServerOptions) {
        self.framing = options.framing;
    }

    pub async fn start(&self, event_tx: EventSender) -> Result<()> {
        let addr: SocketAddr = format!("0.0.0.0:{}", self.port).parse().expect("valid bind address");
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening tcp://{}", addr);

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            signal_ready(&event_tx);
        });

        loop {
            let (stream, peer) = listener.accept().await?;
            let dispatcher = Arc::clone(&self.dispatcher);
            let framing = self.framing.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, dispatcher, framing).await {
                    tracing::debug!("connection from {} ended: {}", peer, e);
                }
            });
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    framing: FramingOptions,
) -> Result<()> {
    loop {
        let frame = match read_frame(&mut stream, &framing).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::debug!("read error: {}", e);
                continue;
            }
        };
        let response = dispatcher.handle(&frame).await;
        write_frame(&mut stream, &framing, &response).await?;
    }
}
