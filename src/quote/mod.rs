//! Quote proxy subsystem.
//!
//! # Data Flow
//! ```text
//! /quote handler
//!     → client.rs (client span, deadline, failure metrics)
//!     → direct.rs (HTTP GET, traceparent header)
//!       or rpc.rs (gRPC GetQuote, traceparent metadata)
//!     → quote text or QuoteError
//! ```
//!
//! # Design Decisions
//! - The transport is chosen once at startup and never switched
//! - One deadline bounds the whole call on both transports
//! - Connections are pooled; a timed-out call does not poison the pool

pub mod client;
pub mod direct;
pub mod rpc;
pub mod types;

pub use client::QuoteProxyClient;
pub use types::{Quote, QuoteError, QuoteResult};
