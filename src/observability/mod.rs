//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Probe cycles, selector, drain tracker produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metric calls are no-ops until a recorder is installed, so library users pay nothing
//! - Candidate tag is the only high-cardinality label

pub mod logging;
pub mod metrics;
