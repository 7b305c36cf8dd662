//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → table, drains, selector → publisher → scheduler → candidates
//!
//! Shutdown (shutdown.rs):
//!     stop() → broadcast → probe cycles exit → publisher flushes → drains (grace, then force-close)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Observatory::stop
//! ```
//!
//! # Design Decisions
//! - Ordered startup: nothing probes before the ranking publisher is running
//! - Ordered shutdown: no new results, then last results published, then connections
//! - Shutdown has a deadline: the drain grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{Observatory, ReconcileReport};
