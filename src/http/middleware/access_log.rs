//! Combined Log Format access log.
//!
//! `host - - [time] "METHOD target PROTO" status size "referer" "agent" duration`
//!
//! The line is written when the record is dropped, so a request whose
//! future is cancelled still leaves a line (with `-` for the status).

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Local};

use crate::observability::logging::AccessLogSink;

struct AccessRecord {
    sink: AccessLogSink,
    remote: String,
    received_at: DateTime<Local>,
    started: Instant,
    method: String,
    target: String,
    protocol: String,
    referer: String,
    user_agent: String,
    status: Option<u16>,
    size: Option<u64>,
}

impl AccessRecord {
    fn format(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} {}\" {} {} \"{}\" \"{}\" {:.3}ms",
            self.remote,
            self.received_at.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.target,
            self.protocol,
            self.status.map_or_else(|| "-".to_string(), |s| s.to_string()),
            self.size.map_or_else(|| "-".to_string(), |s| s.to_string()),
            self.referer,
            self.user_agent,
            self.started.elapsed().as_secs_f64() * 1000.0,
        )
    }
}

impl Drop for AccessRecord {
    fn drop(&mut self) {
        self.sink.write_line(&self.format());
    }
}

pub async fn log_access(State(sink): State<AccessLogSink>, request: Request, next: Next) -> Response {
    if !sink.is_enabled() {
        return next.run(request).await;
    }

    let mut record = AccessRecord {
        remote: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "-".to_string()),
        received_at: Local::now(),
        started: Instant::now(),
        method: request.method().to_string(),
        target: request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string()),
        protocol: format!("{:?}", request.version()),
        referer: header_value(&request, header::REFERER),
        user_agent: header_value(&request, header::USER_AGENT),
        status: None,
        size: None,
        sink,
    };

    let response = next.run(request).await;
    record.status = Some(response.status().as_u16());
    record.size = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact());
    response
}

fn header_value(request: &Request, name: header::HeaderName) -> String {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::SharedBuffer;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_combined_log_line() {
        let buffer = SharedBuffer::new();
        let sink = AccessLogSink::to_writer(buffer.clone());
        let app = Router::new()
            .route("/healthz", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(sink, log_access));

        app.oneshot(
            Request::builder()
                .uri("/healthz?check=1")
                .header("user-agent", "curl/8.5.0")
                .header("referer", "http://example.com/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        let line = buffer.contents();
        assert!(line.starts_with("- - - ["), "{}", line);
        assert!(line.contains("\"GET /healthz?check=1 HTTP/1.1\" 200 2"), "{}", line);
        assert!(line.contains("\"http://example.com/\" \"curl/8.5.0\""), "{}", line);
        assert!(line.trim_end().ends_with("ms"));
        assert_eq!(line.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_sink_writes_nothing() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(AccessLogSink::disabled(), log_access));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
}
