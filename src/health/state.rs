//! Candidate health state.
//!
//! # States
//! - Untested: registered (or recovering) and not yet measured
//! - Qualified: reachable, latency under the quality ceiling
//! - Unqualified: reachable but too slow
//! - Failed: unreachable
//!
//! # Ordering
//! Every state maps to a ranking duration. Qualified uses its measured RTT,
//! the others use sentinels above any timeout-bounded measurement:
//! ```text
//! RTT_FAILED      = Duration::MAX
//! RTT_UNTESTED    = Duration::MAX - 1ns
//! RTT_UNQUALIFIED = Duration::MAX - 2ns
//! ```
//! so one ascending sort gives Qualified (fastest first), Unqualified,
//! Untested, Failed.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::probe::ProbeFailure;

pub const RTT_FAILED: Duration = Duration::new(u64::MAX, 999_999_999);
pub const RTT_UNTESTED: Duration = Duration::new(u64::MAX, 999_999_998);
pub const RTT_UNQUALIFIED: Duration = Duration::new(u64::MAX, 999_999_997);

/// Returns true for the three reserved ranking durations.
pub fn is_sentinel(rtt: Duration) -> bool {
    rtt >= RTT_UNQUALIFIED
}

/// Health of a single candidate, carrying the data each state needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthState {
    Untested,
    Qualified { rtt: Duration },
    /// Reachable but above the quality ceiling; `rtt` is kept for reporting only.
    Unqualified { rtt: Duration },
    Failed { reason: ProbeFailure },
}

impl HealthState {
    /// Ranking key: the real RTT when Qualified, a sentinel otherwise.
    pub fn last_duration(&self) -> Duration {
        match self {
            HealthState::Qualified { rtt } => *rtt,
            HealthState::Unqualified { .. } => RTT_UNQUALIFIED,
            HealthState::Untested => RTT_UNTESTED,
            HealthState::Failed { .. } => RTT_FAILED,
        }
    }

    /// Most recent real measurement, if the state carries one.
    pub fn measured(&self) -> Option<Duration> {
        match self {
            HealthState::Qualified { rtt } | HealthState::Unqualified { rtt } => Some(*rtt),
            _ => None,
        }
    }

    /// Whether the candidate may carry traffic.
    pub fn is_usable(&self) -> bool {
        matches!(self, HealthState::Qualified { .. } | HealthState::Unqualified { .. })
    }

    pub fn label(&self) -> StateLabel {
        match self {
            HealthState::Untested => StateLabel::Untested,
            HealthState::Qualified { .. } => StateLabel::Qualified,
            HealthState::Unqualified { .. } => StateLabel::Unqualified,
            HealthState::Failed { .. } => StateLabel::Failed,
        }
    }
}

/// Data-free view of a [`HealthState`], for logs, metrics and the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateLabel {
    Untested,
    Qualified,
    Unqualified,
    Failed,
}

impl StateLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateLabel::Untested => "untested",
            StateLabel::Qualified => "qualified",
            StateLabel::Unqualified => "unqualified",
            StateLabel::Failed => "failed",
        }
    }

    /// Numeric encoding for the state gauge.
    pub fn gauge_value(&self) -> f64 {
        match self {
            StateLabel::Untested => 0.0,
            StateLabel::Qualified => 1.0,
            StateLabel::Unqualified => 2.0,
            StateLabel::Failed => 3.0,
        }
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-candidate record mutated only by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateHealth {
    pub state: HealthState,
    pub last_probe_time: Option<SystemTime>,
    pub consecutive_failures: u32,
    /// Probes for which a Qualified candidate kept its stale RTT after a failure.
    pub consecutive_borderline: u32,
}

impl CandidateHealth {
    pub fn new() -> Self {
        Self {
            state: HealthState::Untested,
            last_probe_time: None,
            consecutive_failures: 0,
            consecutive_borderline: 0,
        }
    }
}

impl Default for CandidateHealth {
    fn default() -> Self {
        Self::new()
    }
}
