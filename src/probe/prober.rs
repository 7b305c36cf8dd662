//! Timeout-bounded latency measurement.

use std::time::{Duration, Instant};
use tokio::time;

use crate::probe::result::{ProbeFailure, ProbeResult};
use crate::probe::target::ProbeTarget;

/// Measures one round trip against a target, bounded by a fixed timeout.
#[derive(Debug, Clone, Copy)]
pub struct Prober {
    timeout: Duration,
}

impl Prober {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a single probe. Never retries and never exceeds the timeout.
    pub async fn probe(&self, target: &dyn ProbeTarget) -> ProbeResult {
        let started = Instant::now();
        match time::timeout(self.timeout, target.round_trip()).await {
            Ok(Ok(())) => ProbeResult::Success(started.elapsed()),
            Ok(Err(failure)) => {
                tracing::debug!(target = %target.describe(), error = %failure, "Probe failed");
                ProbeResult::Failure(failure)
            }
            Err(_) => {
                tracing::debug!(target = %target.describe(), timeout = ?self.timeout, "Probe timed out");
                ProbeResult::Failure(ProbeFailure::Timeout(self.timeout))
            }
        }
    }
}
