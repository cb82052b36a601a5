//! Distributed tracing on OpenTelemetry.
//!
//! # Responsibilities
//! - Extract trace context from incoming requests (W3C `traceparent`, B3)
//! - Inject the active span's context into backend requests
//! - Start server and client spans on the SDK tracer
//!
//! # Design Decisions
//! - A span travels inside an OpenTelemetry [`Context`]; it is ended
//!   explicitly or, on any other exit path, when the last context holding it
//!   drops. The SDK never ends a span twice
//! - W3C wins over B3 when a request carries both
//! - Outbound calls only carry W3C headers
//! - Exporter choice is configuration; without one spans still get ids and
//!   propagate

use std::borrow::Cow;
use std::fmt;

use axum::http::HeaderMap;
use opentelemetry::propagation::{Injector, TextMapPropagator};
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer as _, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_http::{HeaderExtractor, HeaderInjector};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use opentelemetry_zipkin::{B3Encoding, Propagator as B3Propagator};
use thiserror::Error;

use crate::config::{ObservabilityConfig, SpanExporterChoice};

pub const TRACEPARENT: &str = "traceparent";
pub const TRACESTATE: &str = "tracestate";
pub const B3_SINGLE: &str = "b3";
pub const B3_TRACE_ID: &str = "x-b3-traceid";

const SERVICE_NAME: &str = "web-edge";

/// Why an inbound propagation header was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceContextError {
    #[error("malformed {0} header")]
    Malformed(&'static str),
}

/// Context of the caller's trace.
///
/// Returns an empty context when the request carries no propagation header,
/// and an error when one is present but unusable.
pub fn extract(headers: &HeaderMap) -> Result<Context, TraceContextError> {
    let extractor = HeaderExtractor(headers);
    let (header, cx) = if headers.contains_key(TRACEPARENT) {
        let cx = TraceContextPropagator::new().extract_with_context(&Context::new(), &extractor);
        (TRACEPARENT, cx)
    } else if headers.contains_key(B3_SINGLE) || headers.contains_key(B3_TRACE_ID) {
        let cx = b3().extract_with_context(&Context::new(), &extractor);
        (B3_SINGLE, cx)
    } else {
        return Ok(Context::new());
    };

    let valid = cx.span().span_context().is_valid();
    if valid {
        Ok(cx)
    } else {
        Err(TraceContextError::Malformed(header))
    }
}

/// Write `traceparent` (and `tracestate` when set) for the span in `cx`.
pub fn inject(cx: &Context, headers: &mut HeaderMap) {
    inject_with(cx, &mut HeaderInjector(headers));
}

/// [`inject`] into any carrier.
pub fn inject_with(cx: &Context, injector: &mut dyn Injector) {
    TraceContextPropagator::new().inject_context(cx, injector);
}

fn b3() -> B3Propagator {
    B3Propagator::with_encoding(B3Encoding::SingleAndMultiHeader)
}

fn resource() -> Resource {
    Resource::builder().with_service_name(SERVICE_NAME).build()
}

/// Span factory shared by the pipeline and the quote client.
#[derive(Clone)]
pub struct Tracer {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
}

impl Tracer {
    pub fn new(provider: SdkTracerProvider) -> Self {
        let tracer = provider.tracer(SERVICE_NAME);
        Self { provider, tracer }
    }

    /// Provider with the configured exporter.
    pub fn from_config(config: &ObservabilityConfig) -> Self {
        let builder = SdkTracerProvider::builder().with_resource(resource());
        let provider = match config.span_exporter {
            SpanExporterChoice::None => builder.build(),
            SpanExporterChoice::Stdout => builder
                .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
                .build(),
        };
        tracing::debug!(exporter = ?config.span_exporter, "Tracer initialized");
        Self::new(provider)
    }

    /// Start a span as a child of `parent` and return the context holding it.
    pub fn start(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
        parent: &Context,
    ) -> Context {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .with_attributes(attributes)
            .start_with_context(&self.tracer, parent);
        parent.with_span(span)
    }

    pub fn provider(&self) -> &SdkTracerProvider {
        &self.provider
    }

    /// Flush and stop the exporter.
    pub fn shutdown(&self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = %e, "Tracer shutdown failed");
        }
    }
}

impl Default for Tracer {
    /// No exporter: spans propagate but go nowhere.
    fn default() -> Self {
        Self::new(SdkTracerProvider::builder().with_resource(resource()).build())
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use opentelemetry::Value;
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SpanData};

    /// Tracer exporting into memory.
    pub fn memory_tracer() -> (Tracer, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        (Tracer::new(provider), exporter)
    }

    pub fn finished(exporter: &InMemorySpanExporter) -> Vec<SpanData> {
        exporter.get_finished_spans().unwrap()
    }

    pub fn attribute(span: &SpanData, key: &str) -> Option<Value> {
        span.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| kv.value.clone())
    }
}
