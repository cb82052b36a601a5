//! Terminal handlers.
//!
//! A single fallback handler resolves the route for `(host, path)` and runs
//! the matching [`Handler`] variant. Every response is tagged with the route
//! name for the metrics layer.

use std::path::Path;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use opentelemetry::Context;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::feed::BoundedQueue;
use crate::http::response::{self, html, moved_permanently, text, with_route};
use crate::http::server::AppState;
use crate::observability::metrics as edge_metrics;
use crate::routing::Handler;

/// Resolve the route and run its handler.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let host = request_host(&request);
    let route = state.inner.router.dispatch(&host, request.uri().path());
    tracing::debug!(host = %host, path = %request.uri().path(), route = %route.name, "Dispatching");

    let response = match &route.handler {
        Handler::Health => text(StatusCode::OK, "ok"),
        Handler::Env => env(request, state.inner.config.listener.max_body_size).await,
        Handler::Metrics => metrics(&state),
        Handler::Redirect { location } => moved_permanently(location),
        Handler::Static { root } => serve_static(root, request).await,
        Handler::Quote => {
            let parent = request.extensions().get::<Context>().cloned().unwrap_or_default();
            quote(&state, &parent).await
        }
        Handler::FeedDrain => drain(&state.inner.feed_queue),
        Handler::Root => text(StatusCode::OK, "nothing here?\n"),
    };
    with_route(response, &route.name)
}

/// `Host` header, falling back to the URI authority (HTTP/2).
fn request_host(request: &Request) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

/// Echo the raw request inside `<pre>`.
async fn env(request: Request, max_body_size: usize) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return text(StatusCode::PAYLOAD_TOO_LARGE, "request body too large\n");
        }
    };

    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut dump = format!("{} {} {:?}\r\n", parts.method, target, parts.version);
    for (name, value) in &parts.headers {
        dump.push_str(&format!(
            "{}: {}\r\n",
            name,
            String::from_utf8_lossy(value.as_bytes())
        ));
    }
    dump.push_str("\r\n");
    dump.push_str(&String::from_utf8_lossy(&body));

    html(
        StatusCode::OK,
        format!("<pre>\n{}\n</pre>\n", response::escape_html(&dump)),
    )
}

fn metrics(state: &AppState) -> Response {
    match &state.inner.metrics {
        Some(handle) => {
            handle.run_upkeep();
            let mut response = text(StatusCode::OK, handle.render());
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        None => text(StatusCode::NOT_FOUND, "metrics disabled\n"),
    }
}

async fn serve_static(root: &Path, request: Request) -> Response {
    match ServeDir::new(root).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

async fn quote(state: &AppState, parent: &Context) -> Response {
    let Some(client) = &state.inner.quote_client else {
        return text(StatusCode::SERVICE_UNAVAILABLE, "quote backend disabled\n");
    };

    match client.fetch_quote(parent).await {
        Ok(quote) => html(StatusCode::OK, quote.text),
        Err(e) => text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Dequeue one feed item, reporting the queue length before and after.
///
/// Payloads are opaque bytes; they are decoded lossily only for display.
fn drain(queue: &BoundedQueue<Bytes>) -> Response {
    let mut body = format!("<p>kafka -> [len before: {}]</p>\n", queue.len());
    let item = queue.dequeue();
    edge_metrics::record_queue_depth(queue.len());
    match item {
        Ok(item) => {
            body.push_str(&response::escape_html(&String::from_utf8_lossy(&item)));
            body.push('\n');
        }
        Err(e) => {
            body.push_str(&e.to_string());
            body.push('\n');
        }
    }
    body.push_str(&format!("<p>kafka -> [len after: {}]</p>\n", queue.len()));
    html(StatusCode::OK, body)
}
