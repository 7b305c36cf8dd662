//! Probe scheduling subsystem.
//!
//! # Data Flow
//! ```text
//! Candidate registered
//!     → cycle.rs spawns an independent task
//!     → sleep(interval ± jitter)            (jitter.rs)
//!     → acquire permit (max C in flight, wait at most one interval)
//!     → Prober::probe (timeout-bounded)
//!     → Classifier::observe (task-owned CandidateHealth)
//!     → TableUpdate::Observe → ranking publisher
//! ```
//!
//! # Design Decisions
//! - One task per candidate: a hung probe only delays its own candidate
//! - Jitter spreads probes so candidates do not fire in bursts
//! - Shutdown and unregistration abandon in-flight probes cooperatively

pub mod cycle;
pub mod jitter;

pub use cycle::Scheduler;
