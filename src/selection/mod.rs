//! Selection subsystem.
//!
//! # Data Flow
//! ```text
//! Routing path asks for an outbound
//!     → selector.availability() (is anything usable?)
//!     → selector.select_best()
//!         - read current snapshot (lock-free)
//!         - compare challenger with held best (margin.rs)
//!         - on switch: drain tracker marks old best draining
//!     → selected CandidateStatus
//! ```
//!
//! # Design Decisions
//! - `select(n)` is raw ranking order; only `select_best` applies hysteresis
//! - An incumbent that stops being Qualified is replaced immediately
//! - "Nothing usable" is a state, not an error

pub mod margin;
pub mod selector;

pub use margin::SwitchMargin;
pub use selector::Selector;
