//! Middleware pipeline.
//!
//! # Data Flow
//! ```text
//! request
//!     → headers.rs (security headers on the way out)
//!     → trace.rs (server span, context into extensions)
//!     → access_log.rs (Combined Log Format line)
//!     → metrics.rs (count + latency by route)
//!     → panic boundary
//!     → dispatch
//! ```
//!
//! # Design Decisions
//! - Layers added later run first, so [`wrap`] adds them innermost first
//! - The access record closes in a drop guard; the span ends when its
//!   context drops if the layer never gets to end it
//! - A panicking handler becomes a plain 500 that still passes every layer above

use std::any::Any;

use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::observability::logging::AccessLogSink;
use crate::observability::metrics as edge_metrics;
use crate::observability::trace::Tracer;

pub mod access_log;
pub mod headers;
pub mod metrics;
pub mod trace;

/// Shared state for the pipeline's stateful layers.
#[derive(Clone, Debug)]
pub struct PipelineState {
    pub tracer: Tracer,
    pub access_log: AccessLogSink,
}

/// Wrap `router` in the standard pipeline.
pub fn wrap(router: Router, state: PipelineState) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(metrics::record_metrics))
        .layer(from_fn_with_state(state.access_log, access_log::log_access))
        .layer(from_fn_with_state(state.tracer, trace::trace_request))
        .layer(from_fn(headers::security_headers))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %message, "Handler panicked");
    edge_metrics::record_panic();

    let mut response = Response::new(Body::from("internal server error\n"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::SharedBuffer;
    use crate::observability::trace::testing::{attribute, finished, memory_tracer};
    use axum::{http::Request, routing::get};
    use opentelemetry::trace::Status;
    use opentelemetry::Value;
    use tower::ServiceExt;

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn test_panic_passes_through_pipeline() {
        let (tracer, exporter) = memory_tracer();
        let buffer = SharedBuffer::new();
        let state = PipelineState {
            tracer: tracer.clone(),
            access_log: AccessLogSink::to_writer(buffer.clone()),
        };
        let router = Router::new().route("/boom", get(boom));

        let response = wrap(router, state)
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in headers::SECURITY_HEADERS {
            assert_eq!(response.headers()[*name], *value);
        }

        let spans = finished(&exporter);
        assert_eq!(spans.len(), 1);
        assert_eq!(attribute(&spans[0], "http.status_code"), Some(Value::I64(500)));
        assert!(matches!(spans[0].status, Status::Error { .. }));

        assert!(buffer.contents().contains("\"GET /boom HTTP/1.1\" 500"));
    }
}
