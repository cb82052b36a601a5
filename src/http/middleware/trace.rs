//! Server span per request.
//!
//! Continues the caller's trace when a propagation header is present,
//! otherwise starts a new one. The span's [`Context`] is handed to handlers
//! through request extensions so outbound calls become its children.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, Version},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt};
use opentelemetry::{Context, KeyValue};

use crate::observability::trace::{self, Tracer};

pub async fn trace_request(State(tracer): State<Tracer>, mut request: Request, next: Next) -> Response {
    let parent = trace::extract(request.headers()).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Ignoring malformed trace header");
        Context::new()
    });

    let mut attributes = vec![
        KeyValue::new("http.method", request.method().to_string()),
        KeyValue::new("http.target", request.uri().path().to_string()),
        KeyValue::new("http.scheme", request.uri().scheme_str().unwrap_or("http").to_string()),
        KeyValue::new("http.flavor", flavor(request.version())),
        KeyValue::new("http.server_name", header_or_empty(&request, header::HOST)),
        KeyValue::new("http.request_content_length", content_length(&request)),
        KeyValue::new("http.user_agent", header_or_empty(&request, header::USER_AGENT)),
    ];
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        attributes.push(KeyValue::new("net.peer.ip", addr.ip().to_string()));
    }

    let cx = tracer.start(
        format!("HTTP {}", request.method()),
        SpanKind::Server,
        attributes,
        &parent,
    );
    request.extensions_mut().insert(cx.clone());
    let response = next.run(request).await;

    let status = response.status();
    let span = cx.span();
    span.set_attribute(KeyValue::new("http.status_code", i64::from(status.as_u16())));
    if status.is_server_error() {
        span.set_status(Status::error(format!("HTTP {}", status.as_u16())));
    }
    span.end();

    response
}

/// Protocol version without the `HTTP/` prefix.
pub fn flavor(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "unknown",
    }
}

fn header_or_empty(request: &Request, name: header::HeaderName) -> String {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn content_length(request: &Request) -> i64 {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
