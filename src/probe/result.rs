//! Probe outcomes.

use std::time::Duration;
use thiserror::Error;

/// Why a probe did not produce a latency sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// No answer within the per-probe timeout.
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// The path could not be established (refused, reset, DNS).
    #[error("connection error: {0}")]
    Connect(String),

    /// The path answered but refused the request at protocol level.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ProbeFailure {
    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeFailure::Timeout(_) => "timeout",
            ProbeFailure::Connect(_) => "connect_error",
            ProbeFailure::Rejected(_) => "rejected",
        }
    }
}

/// Immutable outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// Round trip completed; carries the measured elapsed time.
    Success(Duration),
    /// Round trip did not complete.
    Failure(ProbeFailure),
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success(_))
    }

    /// Label used for metrics (`success` or the failure kind).
    pub fn outcome(&self) -> &'static str {
        match self {
            ProbeResult::Success(_) => "success",
            ProbeResult::Failure(failure) => failure.label(),
        }
    }
}
