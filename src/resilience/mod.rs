//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to quote backend:
//!     → timeouts.rs (enforce per-call deadline)
//!     → failure surfaced to the caller, never retried here
//!
//! Feed ingestor read errors:
//!     → backoff.rs (capped exponential delay, reset on success)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries on the request path: fail fast, let the client retry
//! - Background loops back off instead of spinning on a dead dependency

pub mod backoff;
pub mod timeouts;

pub use backoff::{calculate_backoff, Backoff};
pub use timeouts::{with_deadline, DeadlineExceeded};
