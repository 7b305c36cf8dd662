//! Copy-on-write ranking table.
//!
//! # Responsibilities
//! - Hold the latest status of every registered candidate
//! - Rebuild and atomically publish a full snapshot per batch of updates
//! - Serve lock-free snapshot reads on the connection hot path

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::ranking::snapshot::{CandidateStatus, RankingSnapshot};

/// A change to the table.
#[derive(Debug, Clone)]
pub enum TableUpdate {
    /// A candidate was registered and starts Untested.
    Register { tag: String, generation: u64 },
    /// A classifier result for a registered candidate.
    Observe(CandidateStatus),
    /// A candidate was unregistered.
    Remove { tag: String, generation: u64 },
}

#[derive(Debug, Default)]
struct Members {
    statuses: HashMap<String, CandidateStatus>,
    version: u64,
}

/// Ranking table: a mutable member map behind a published immutable snapshot.
#[derive(Debug)]
pub struct RankingTable {
    current: ArcSwap<RankingSnapshot>,
    members: Mutex<Members>,
}

impl RankingTable {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(RankingSnapshot::default()),
            members: Mutex::new(Members::default()),
        }
    }

    /// Current snapshot. Never blocks on a rebuild.
    pub fn snapshot(&self) -> Arc<RankingSnapshot> {
        self.current.load_full()
    }

    /// Apply a batch of updates and publish one new snapshot if anything changed.
    ///
    /// Observations and removals carrying a stale generation are dropped, so a
    /// late result from an unregistered candidate cannot resurrect it.
    pub fn apply<I>(&self, updates: I) -> bool
    where
        I: IntoIterator<Item = TableUpdate>,
    {
        let mut members = self.members.lock().expect("ranking table mutex poisoned");
        let mut changed = false;

        for update in updates {
            match update {
                TableUpdate::Register { tag, generation } => {
                    let status = CandidateStatus::untested(tag.clone(), generation);
                    members.statuses.insert(tag, status);
                    changed = true;
                }
                TableUpdate::Observe(status) => {
                    if let Some(existing) = members.statuses.get_mut(&status.tag) {
                        if existing.generation == status.generation && *existing != status {
                            *existing = status;
                            changed = true;
                        }
                    }
                }
                TableUpdate::Remove { tag, generation } => {
                    let matches = members
                        .statuses
                        .get(&tag)
                        .is_some_and(|existing| existing.generation == generation);
                    if matches {
                        members.statuses.remove(&tag);
                        changed = true;
                    }
                }
            }
        }

        if changed {
            members.version += 1;
            let snapshot = RankingSnapshot::build(members.version, members.statuses.values().cloned());
            self.current.store(Arc::new(snapshot));
        }
        changed
    }
}

impl Default for RankingTable {
    fn default() -> Self {
        Self::new()
    }
}
