//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build server → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain within grace period → Exit 0
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error exits non-zero
//! - Listener binds last (traffic only when ready)
//! - Shutdown has a timeout: forced exit after the grace period

pub mod shutdown;
pub mod signals;

pub use shutdown::{drain_within, Shutdown};
pub use signals::wait_for_signal;
