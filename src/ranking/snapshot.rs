//! Immutable ranking snapshots.

use std::time::{Duration, SystemTime};

use crate::health::{CandidateHealth, HealthState, StateLabel};

/// Query-facing record of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateStatus {
    pub tag: String,
    /// Registration generation; updates from an older generation are ignored.
    pub generation: u64,
    pub state: HealthState,
    pub last_probe_time: Option<SystemTime>,
    pub consecutive_failures: u32,
    pub consecutive_borderline: u32,
}

impl CandidateStatus {
    /// Status of a freshly registered candidate.
    pub fn untested(tag: impl Into<String>, generation: u64) -> Self {
        Self::from_health(tag, generation, &CandidateHealth::new())
    }

    pub fn from_health(tag: impl Into<String>, generation: u64, health: &CandidateHealth) -> Self {
        Self {
            tag: tag.into(),
            generation,
            state: health.state.clone(),
            last_probe_time: health.last_probe_time,
            consecutive_failures: health.consecutive_failures,
            consecutive_borderline: health.consecutive_borderline,
        }
    }

    /// Ranking key (real RTT or sentinel).
    pub fn last_duration(&self) -> Duration {
        self.state.last_duration()
    }

    pub fn label(&self) -> StateLabel {
        self.state.label()
    }
}

/// Whether any candidate can currently carry traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// At least one Qualified or Unqualified candidate exists.
    Available { usable: usize },
    /// No Qualified or Unqualified candidate exists.
    NoneUsable,
}

/// Fully ordered, immutable view of all candidates.
#[derive(Debug, Clone, Default)]
pub struct RankingSnapshot {
    version: u64,
    entries: Vec<CandidateStatus>,
}

impl RankingSnapshot {
    /// Sort `statuses` by ranking key, ties broken by tag.
    pub fn build(version: u64, statuses: impl IntoIterator<Item = CandidateStatus>) -> Self {
        let mut entries: Vec<CandidateStatus> = statuses.into_iter().collect();
        entries.sort_by(|a, b| {
            a.last_duration()
                .cmp(&b.last_duration())
                .then_with(|| a.tag.cmp(&b.tag))
        });
        Self { version, entries }
    }

    /// Monotonic publish counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[CandidateStatus] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&CandidateStatus> {
        self.entries.first()
    }

    /// The best `n` entries (fewer if the snapshot is shorter).
    pub fn top(&self, n: usize) -> &[CandidateStatus] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn get(&self, tag: &str) -> Option<&CandidateStatus> {
        self.entries.iter().find(|c| c.tag == tag)
    }

    pub fn position(&self, tag: &str) -> Option<usize> {
        self.entries.iter().position(|c| c.tag == tag)
    }

    pub fn availability(&self) -> Availability {
        let usable = self.entries.iter().filter(|c| c.state.is_usable()).count();
        if usable == 0 {
            Availability::NoneUsable
        } else {
            Availability::Available { usable }
        }
    }
}
