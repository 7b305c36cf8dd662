//! Probe result classification with hysteresis.
//!
//! # State Transitions
//! ```text
//! Untested    + success      → Qualified(d)   (Unqualified(d) above ceiling)
//! Untested    + failure      → Failed
//! Qualified   + success      → Qualified(d) / Unqualified(d) above ceiling
//! Qualified   + failure      → Failed once failures >= F, else Qualified (stale d)
//! Unqualified + success      → Qualified(d) under ceiling, else Unqualified(d)
//! Unqualified + failure      → Failed once failures >= F
//! Failed      + success      → Untested
//! Failed      + failure      → Failed
//! ```

use std::time::{Duration, SystemTime};

use crate::config::ClassifierConfig;
use crate::health::state::{CandidateHealth, HealthState, StateLabel};
use crate::probe::{ProbeFailure, ProbeResult};

/// State change produced by one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StateLabel,
    pub to: StateLabel,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Applies probe results to candidate health.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    failure_threshold: u32,
    quality_ceiling: Duration,
}

impl Classifier {
    pub fn new(failure_threshold: u32, quality_ceiling: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            quality_ceiling,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            config.failure_threshold,
            Duration::from_millis(config.quality_ceiling_ms),
        )
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn quality_ceiling(&self) -> Duration {
        self.quality_ceiling
    }

    /// Fold one probe result into `health`.
    pub fn observe(&self, health: &mut CandidateHealth, result: &ProbeResult) -> Transition {
        let from = health.state.label();
        health.last_probe_time = Some(SystemTime::now());

        match result {
            ProbeResult::Success(rtt) => self.on_success(health, *rtt),
            ProbeResult::Failure(reason) => self.on_failure(health, reason),
        }

        Transition { from, to: health.state.label() }
    }

    fn on_success(&self, health: &mut CandidateHealth, rtt: Duration) {
        health.consecutive_failures = 0;
        health.consecutive_borderline = 0;

        health.state = match health.state {
            // Recovery restarts from a clean slate.
            HealthState::Failed { .. } => HealthState::Untested,
            _ => self.grade(rtt),
        };
    }

    fn on_failure(&self, health: &mut CandidateHealth, reason: &ProbeFailure) {
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        let exhausted = health.consecutive_failures >= self.failure_threshold;

        match health.state {
            HealthState::Untested | HealthState::Failed { .. } => {
                health.state = HealthState::Failed { reason: reason.clone() };
            }
            HealthState::Qualified { .. } | HealthState::Unqualified { .. } if exhausted => {
                health.consecutive_borderline = 0;
                health.state = HealthState::Failed { reason: reason.clone() };
            }
            HealthState::Qualified { .. } => {
                health.consecutive_borderline = health.consecutive_borderline.saturating_add(1);
            }
            HealthState::Unqualified { .. } => {}
        }
    }

    fn grade(&self, rtt: Duration) -> HealthState {
        if rtt > self.quality_ceiling {
            HealthState::Unqualified { rtt }
        } else {
            HealthState::Qualified { rtt }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::is_sentinel;

    fn ms(v: u64) -> ProbeResult {
        ProbeResult::Success(Duration::from_millis(v))
    }

    fn fail() -> ProbeResult {
        ProbeResult::Failure(ProbeFailure::Connect("connection refused".into()))
    }

    fn classifier() -> Classifier {
        Classifier::new(3, Duration::from_millis(500))
    }

    #[test]
    fn first_probe_decides() {
        let c = classifier();

        let mut ok = CandidateHealth::new();
        let t = c.observe(&mut ok, &ms(50));
        assert_eq!(t, Transition { from: StateLabel::Untested, to: StateLabel::Qualified });
        assert_eq!(ok.state, HealthState::Qualified { rtt: Duration::from_millis(50) });
        assert!(ok.last_probe_time.is_some());

        let mut bad = CandidateHealth::new();
        c.observe(&mut bad, &fail());
        assert_eq!(bad.state.label(), StateLabel::Failed);
        assert_eq!(bad.consecutive_failures, 1);
    }

    #[test]
    fn qualified_tolerates_failures_below_threshold() {
        let c = classifier();
        let mut h = CandidateHealth::new();
        c.observe(&mut h, &ms(80));

        c.observe(&mut h, &fail());
        c.observe(&mut h, &fail());
        assert_eq!(h.state, HealthState::Qualified { rtt: Duration::from_millis(80) });
        assert_eq!(h.consecutive_failures, 2);
        assert_eq!(h.consecutive_borderline, 2);

        let t = c.observe(&mut h, &fail());
        assert!(t.changed());
        assert_eq!(h.state.label(), StateLabel::Failed);
        assert!(is_sentinel(h.state.last_duration()));
    }

    #[test]
    fn success_resets_counters() {
        let c = classifier();
        let mut h = CandidateHealth::new();
        c.observe(&mut h, &ms(80));
        c.observe(&mut h, &fail());
        c.observe(&mut h, &fail());
        c.observe(&mut h, &ms(70));

        assert_eq!(h.consecutive_failures, 0);
        assert_eq!(h.consecutive_borderline, 0);

        // Two more failures are tolerated again.
        c.observe(&mut h, &fail());
        c.observe(&mut h, &fail());
        assert_eq!(h.state.label(), StateLabel::Qualified);
    }

    #[test]
    fn slow_success_is_unqualified_and_recovers() {
        let c = classifier();
        let mut h = CandidateHealth::new();
        c.observe(&mut h, &ms(100));

        c.observe(&mut h, &ms(900));
        assert_eq!(h.state, HealthState::Unqualified { rtt: Duration::from_millis(900) });

        c.observe(&mut h, &ms(120));
        assert_eq!(h.state, HealthState::Qualified { rtt: Duration::from_millis(120) });
    }

    #[test]
    fn unqualified_fails_after_threshold() {
        let c = classifier();
        let mut h = CandidateHealth::new();
        c.observe(&mut h, &ms(900));
        assert_eq!(h.state.label(), StateLabel::Unqualified);

        c.observe(&mut h, &fail());
        c.observe(&mut h, &fail());
        assert_eq!(h.state.label(), StateLabel::Unqualified);
        assert_eq!(h.consecutive_borderline, 0);

        c.observe(&mut h, &fail());
        assert_eq!(h.state.label(), StateLabel::Failed);
    }

    #[test]
    fn failed_recovers_through_untested() {
        let c = classifier();
        let mut h = CandidateHealth::new();
        c.observe(&mut h, &fail());
        assert_eq!(h.state.label(), StateLabel::Failed);

        c.observe(&mut h, &ms(40));
        assert_eq!(h.state, HealthState::Untested);

        c.observe(&mut h, &ms(40));
        assert_eq!(h.state, HealthState::Qualified { rtt: Duration::from_millis(40) });
    }

    #[test]
    fn recovering_candidate_fails_immediately() {
        let c = classifier();
        let mut h = CandidateHealth::new();
        c.observe(&mut h, &fail());
        c.observe(&mut h, &ms(40));
        assert_eq!(h.state, HealthState::Untested);

        c.observe(&mut h, &fail());
        assert_eq!(h.state.label(), StateLabel::Failed);
    }

    #[test]
    fn failed_keeps_latest_reason() {
        let c = classifier();
        let mut h = CandidateHealth::new();
        c.observe(&mut h, &fail());
        c.observe(&mut h, &ProbeResult::Failure(ProbeFailure::Timeout(Duration::from_secs(5))));

        assert_eq!(
            h.state,
            HealthState::Failed { reason: ProbeFailure::Timeout(Duration::from_secs(5)) }
        );
        assert_eq!(h.consecutive_failures, 2);
    }
}
