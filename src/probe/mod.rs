//! Probing subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler tick
//!     → prober.rs (timeout-bounded measurement)
//!     → target.rs (transport-owned round trip: TCP connect, HTTP GET, HTTP GET via proxy)
//!     → result.rs (Success(rtt) | Failure(reason))
//!     → health classifier
//! ```
//!
//! # Design Decisions
//! - One probe is one round trip; no retries inside a probe
//! - The prober owns the clock and the timeout, targets only report success/failure
//! - Probe failures are data, never system errors

pub mod prober;
pub mod result;
pub mod target;

pub use prober::Prober;
pub use result::{ProbeFailure, ProbeResult};
pub use target::{HttpTarget, ProbeTarget, TargetError, TcpTarget};
