// http.rs
//
// HTTP/HTTPS transport server (spec §4.5): `POST /` only (axum's router
// returns 405 for any other method on a routed path for free). Plain HTTP
// is served with `axum::serve`; HTTPS terminates TLS itself via
// `tokio-rustls` and hands each decrypted stream to `hyper-util`'s auto
// connection builder, since `axum::serve` has no TLS mode of its own —
// grounded on `Shuozeli-grpcurl-rs`'s rustls/hyper-util/tower stack.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use rustls::pki_types::CertificateDer;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use super::event::{signal_ready, EventSender};
use super::options::{HttpServerOptions, TlsOptions};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};

async fn handle(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> impl IntoResponse {
    let response = dispatcher.handle(&body).await;
    ([(header::CONTENT_TYPE, "application/json")], response)
}

pub struct HttpServer {
    port: u16,
    dispatcher: Arc<Dispatcher>,
    tls: Option<TlsOptions>,
}

impl HttpServer {
    pub fn new(port: u16, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            port,
            dispatcher,
            tls: None,
        }
    }

    pub fn set_options(&mut self, options: HttpServerOptions) {
        self.tls = options.tls;
    }

    pub async fn start(&self, event_tx: EventSender) -> Result<()> {
        let app = Router::new()
            .route("/", post(handle))
            .with_state(Arc::clone(&self.dispatcher));
        let addr: SocketAddr = format!("0.0.0.0:{}", self.port).parse().expect("valid bind address");
        let listener = TcpListener::bind(addr).await?;

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            signal_ready(&event_tx);
        });

        match &self.tls {
            None => {
                tracing::info!("Listening http://{}", addr);
                axum::serve(listener, app).await?;
                Ok(())
            }
            Some(tls) => {
                tracing::info!("Listening https://{}", addr);
                let config = load_tls_config(tls)?;
                let acceptor = TlsAcceptor::from(Arc::new(config));
                loop {
                    let (stream, peer) = listener.accept().await?;
                    let acceptor = acceptor.clone();
                    let app = app.clone();
                    tokio::spawn(async move {
                        let tls_stream = match acceptor.accept(stream).await {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::debug!("TLS handshake failed for {}: {}", peer, e);
                                return;
                            }
                        };
                        let io = TokioIo::new(tls_stream);
                        let service = hyper::service::service_fn(move |req| {
                            let mut app = app.clone();
                            use tower::Service;
                            app.call(req)
                        });
                        if let Err(e) = AutoBuilder::new(TokioExecutor::new())
                            .serve_connection(io, service)
                            .await
                        {
                            tracing::debug!("HTTPS connection with {} ended: {}", peer, e);
                        }
                    });
                }
            }
        }
    }
}

fn load_tls_config(tls: &TlsOptions) -> Result<rustls::ServerConfig> {
    let cert_file = std::fs::File::open(&tls.cert_path)?;
    let mut cert_reader = std::io::BufReader::new(cert_file);
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut cert_reader)
        .collect::<std::result::Result<_, _>>()?;

    let key_file = std::fs::File::open(&tls.key_path)?;
    let mut key_reader = std::io::BufReader::new(key_file);
    let key = rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| Error::Wire(format!("no private key found in {:?}", tls.key_path)))?;

    rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::Wire(e.to_string()))
}
