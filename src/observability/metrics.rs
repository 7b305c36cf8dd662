//! Metrics collection and exposition.
//!
//! # Metrics
//! - `observatory_probes_total` (counter): probes by candidate and outcome
//! - `observatory_probe_duration_seconds` (histogram): successful round-trip times
//! - `observatory_probes_skipped_total` (counter): cycles skipped for lack of a permit
//! - `observatory_candidate_state` (gauge): 0=untested 1=qualified 2=unqualified 3=failed
//! - `observatory_selection_switches_total` (counter): changes of the selected best
//! - `observatory_drained_bytes_total` (counter): bytes discarded while draining
//! - `observatory_drain_errors_total` (counter): drains that ended in an error

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::health::StateLabel;
use crate::probe::ProbeResult;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_probe(tag: &str, result: &ProbeResult) {
    counter!(
        "observatory_probes_total",
        "candidate" => tag.to_string(),
        "outcome" => result.outcome()
    )
    .increment(1);

    if let ProbeResult::Success(rtt) = result {
        histogram!("observatory_probe_duration_seconds", "candidate" => tag.to_string())
            .record(rtt.as_secs_f64());
    }
}

pub fn record_probe_skipped(tag: &str) {
    counter!("observatory_probes_skipped_total", "candidate" => tag.to_string()).increment(1);
}

pub fn record_candidate_state(tag: &str, state: StateLabel) {
    gauge!("observatory_candidate_state", "candidate" => tag.to_string()).set(state.gauge_value());
}

pub fn record_selection_switch() {
    counter!("observatory_selection_switches_total").increment(1);
}

pub fn record_drain(tag: &str, bytes: u64) {
    counter!("observatory_drained_bytes_total", "candidate" => tag.to_string()).increment(bytes);
}

pub fn record_drain_error(tag: &str) {
    counter!("observatory_drain_errors_total", "candidate" => tag.to_string()).increment(1);
}
