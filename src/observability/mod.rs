//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, access log sink)
//!     → metrics.rs (counters, gauges, histograms)
//!     → trace.rs (OpenTelemetry spans with propagated trace context)
//!
//! Consumers:
//!     → Log aggregation (stdout, file)
//!     → Metrics endpoint (Prometheus scrape on /metrics)
//!     → Span exporters (stdout when configured, in-memory for tests)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Trace context flows from the inbound request to the quote backend
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod trace;

pub use trace::{TraceContextError, Tracer};
