//! Multi-tenant edge server library.
//!
//! Serves several virtual hosts from one process: static sites, a quote
//! proxy with a choice of backend transports, and a feed drain backed by a
//! bounded queue.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Backends
pub mod feed;
pub mod quote;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::EdgeConfig;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
