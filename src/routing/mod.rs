//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (normalize host, evaluate host pattern + path prefix)
//!     → Return: matched Route, or the default route
//!
//! Route Compilation (at startup):
//!     EdgeConfig.sites[]
//!     → health / env / metrics routes on any host
//!     → per site: apex redirect, feed drain, quote, static files
//!     → Freeze as immutable HostRouter
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Most specific prefix wins, then registration order

pub mod matcher;
pub mod router;

pub use matcher::{normalize_host, HostPattern, PathPrefix};
pub use router::{Handler, HostRouter, Route};
