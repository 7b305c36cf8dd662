//! Outbound latency observatory.
//!
//! Continuously probes a set of outbound candidates, classifies their health
//! from round-trip times, keeps them in a lock-free ranking and selects the
//! best one with switch hysteresis. Connections routed to a demoted or removed
//! candidate are drained instead of severed.

// Measurement
pub mod probe;
pub mod health;
pub mod scheduler;

// Ranking and selection
pub mod registry;
pub mod ranking;
pub mod selection;
pub mod drain;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod admin;

pub use config::schema::ObservatoryConfig;
pub use error::{ObservatoryError, ObservatoryResult};
pub use lifecycle::{Observatory, ReconcileReport, Shutdown};
