//! Health classification subsystem.
//!
//! # Data Flow
//! ```text
//! ProbeResult (from probe/)
//!     → classifier.rs (hysteresis: failure threshold F, quality ceiling)
//!     → state.rs (CandidateHealth updated in place)
//!     → CandidateStatus sent to the ranking publisher
//! ```
//!
//! # Design Decisions
//! - Health state is per-candidate and single-writer (the candidate's probe cycle)
//! - Non-qualified states rank by sentinel durations, so ordering is a plain sort
//! - A failed candidate must pass through Untested before it can qualify again

pub mod classifier;
pub mod state;

pub use classifier::{Classifier, Transition};
pub use state::{CandidateHealth, HealthState, StateLabel};
