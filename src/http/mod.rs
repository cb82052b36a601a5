//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, shared state, graceful shutdown)
//!     → request.rs (request ID)
//!     → middleware/ (security headers, trace span, access log, metrics, panic boundary)
//!     → handlers.rs (HostRouter dispatch → terminal handler)
//!     → response.rs (route tag, body helpers)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{AppState, EdgeServer, StartupError};
