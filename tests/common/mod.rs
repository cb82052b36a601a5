//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use opentelemetry::Value;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tonic::body::BoxBody;
use tonic::codec::ProstCodec;
use tonic::codegen::{empty_body, http, BoxFuture, Context, Poll, Service};
use tonic::metadata::MetadataMap;
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::transport::server::TcpIncoming;

use web_edge::config::{EdgeConfig, SiteConfig, TransportChoice};
use web_edge::observability::Tracer;
use web_edge::quote::rpc::{GetQuoteRequest, GetQuoteResponse, GET_QUOTE_PATH};

/// Read until the end of the request headers so the client sees a clean close.
async fn read_request_head(socket: &mut TcpStream) {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    return;
                }
            }
        }
    }
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    start_programmable_backend(addr, move || async move { (200, response.to_string()) }).await;
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        let (status, body) = f().await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_line(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a backend that accepts connections and never answers.
pub async fn start_hanging_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        tokio::time::sleep(Duration::from_secs(600)).await;
                        drop(socket);
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// `quote.Quote` service answering `GetQuote` after a fixed delay.
///
/// Metadata of every request is kept for inspection.
#[derive(Clone)]
pub struct QuoteStub {
    text: String,
    delay: Duration,
    seen: Arc<Mutex<Vec<MetadataMap>>>,
}

impl QuoteStub {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            delay: Duration::ZERO,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Metadata of the requests received so far.
    pub fn seen(&self) -> Vec<MetadataMap> {
        self.seen.lock().unwrap().clone()
    }
}

impl NamedService for QuoteStub {
    const NAME: &'static str = "quote.Quote";
}

impl Service<http::Request<BoxBody>> for QuoteStub {
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<BoxBody>) -> Self::Future {
        let stub = self.clone();
        Box::pin(async move {
            if request.uri().path() != GET_QUOTE_PATH {
                let mut response = http::Response::new(empty_body());
                let headers = response.headers_mut();
                headers.insert("grpc-status", (tonic::Code::Unimplemented as i32).into());
                headers.insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static("application/grpc"),
                );
                return Ok(response);
            }
            let mut grpc = Grpc::new(ProstCodec::<GetQuoteResponse, GetQuoteRequest>::default());
            Ok(grpc.unary(GetQuote(stub), request).await)
        })
    }
}

struct GetQuote(QuoteStub);

impl UnaryService<GetQuoteRequest> for GetQuote {
    type Response = GetQuoteResponse;
    type Future = BoxFuture<tonic::Response<GetQuoteResponse>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<GetQuoteRequest>) -> Self::Future {
        let stub = self.0.clone();
        Box::pin(async move {
            stub.seen.lock().unwrap().push(request.metadata().clone());
            tokio::time::sleep(stub.delay).await;
            Ok(tonic::Response::new(GetQuoteResponse {
                quote_text: stub.text,
            }))
        })
    }
}

/// Serve `stub` on `addr`. Returns once the socket is bound.
pub async fn start_grpc_backend(addr: SocketAddr, stub: QuoteStub) {
    let listener = TcpListener::bind(addr).await.unwrap();
    let incoming = TcpIncoming::from_listener(listener, true, None).unwrap();
    tokio::spawn(async move {
        let _ = tonic::transport::Server::builder()
            .add_service(stub)
            .serve_with_incoming(incoming)
            .await;
    });
}

/// Tracer exporting into memory.
pub fn memory_tracer() -> (Tracer, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    (Tracer::new(provider), exporter)
}

/// Finished spans with the given name.
pub fn spans_named(exporter: &InMemorySpanExporter, name: &str) -> Vec<SpanData> {
    exporter
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .filter(|span| span.name == name)
        .collect()
}

pub fn attribute(span: &SpanData, key: &str) -> Option<Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.clone())
}

/// Config serving `example.com` with a direct quote backend at `backend`.
pub fn edge_config(listen: SocketAddr, backend: SocketAddr) -> EdgeConfig {
    let mut config = EdgeConfig::default();
    config.listener.bind_address = listen.to_string();
    config.sites.push(SiteConfig::new("example.com"));
    config.quote.transport = TransportChoice::Direct;
    config.quote.http_url = format!("http://{}/", backend);
    config.observability.access_log = false;
    config
}

/// HTTP client that bypasses any system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
