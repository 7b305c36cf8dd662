//! Connection draining subsystem.
//!
//! # Data Flow
//! ```text
//! Connection routed to candidate
//!     → tracker.open(tag) → DrainHandle
//!     → consumer reads: handle.acknowledge_receive(n)
//!
//! Selector switches held best away from candidate:
//!     → tracker.mark_draining(tag)
//! Candidate unregistered:
//!     → tracker.retire(tag)
//!
//! Connection teardown:
//!     → handle.drain(reader) (read to EOF, discard)
//!     → handle dropped, tracker forgets it
//!
//! Shutdown:
//!     → tracker.shutdown() (grace period, then force-close)
//! ```
//!
//! # Design Decisions
//! - Demotion never severs a connection
//! - Shutdown does not cancel drains; it only bounds how long they may take

pub mod handle;
pub mod tracker;

pub use handle::{ConnectionId, DrainError, DrainHandle, DrainPhase, DrainSummary, Drainer};
pub use tracker::DrainTracker;
