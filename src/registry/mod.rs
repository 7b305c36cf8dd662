//! Candidate registry.
//!
//! # Responsibilities
//! - Own the set of registered candidates, keyed by tag
//! - Reject empty and duplicate tags
//! - Hand out a fresh generation number per registration
//!
//! # Design Decisions
//! - DashMap entry API makes the duplicate check and insert one step
//! - Side effects of registering and removing run while the entry's shard is
//!   locked, so a register and a remove of the same tag never interleave
//! - Generations are never reused, even after unregistration

pub mod candidate;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::TargetConfig;
use crate::error::ObservatoryError;
use crate::probe::ProbeTarget;

pub use candidate::Candidate;

#[derive(Debug)]
pub struct Registry {
    candidates: DashMap<String, Candidate>,
    next_generation: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            candidates: DashMap::new(),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Register `tag`. Fails if the tag is empty or already present.
    pub fn insert(
        &self,
        tag: &str,
        target: Arc<dyn ProbeTarget>,
        source: Option<TargetConfig>,
    ) -> Result<Candidate, ObservatoryError> {
        self.insert_with(tag, target, source, |_| {})
    }

    /// Register `tag`, running `on_insert` before the entry is released.
    ///
    /// `on_insert` must not touch the registry.
    pub fn insert_with<F>(
        &self,
        tag: &str,
        target: Arc<dyn ProbeTarget>,
        source: Option<TargetConfig>,
        on_insert: F,
    ) -> Result<Candidate, ObservatoryError>
    where
        F: FnOnce(&Candidate),
    {
        if tag.trim().is_empty() {
            return Err(ObservatoryError::EmptyTag);
        }

        match self.candidates.entry(tag.to_string()) {
            Entry::Occupied(_) => Err(ObservatoryError::DuplicateCandidate(tag.to_string())),
            Entry::Vacant(slot) => {
                let candidate = Candidate {
                    tag: tag.to_string(),
                    generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
                    target,
                    source,
                    registered_at: SystemTime::now(),
                };
                on_insert(&candidate);
                slot.insert(candidate.clone());
                Ok(candidate)
            }
        }
    }

    pub fn remove(&self, tag: &str) -> Option<Candidate> {
        self.remove_with(tag, |_| {})
    }

    /// Remove `tag`, running `on_remove` before the entry is released.
    ///
    /// `on_remove` must not touch the registry.
    pub fn remove_with<F>(&self, tag: &str, on_remove: F) -> Option<Candidate>
    where
        F: FnOnce(&Candidate),
    {
        match self.candidates.entry(tag.to_string()) {
            Entry::Occupied(entry) => {
                on_remove(entry.get());
                Some(entry.remove())
            }
            Entry::Vacant(_) => None,
        }
    }

    pub fn get(&self, tag: &str) -> Option<Candidate> {
        self.candidates.get(tag).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.candidates.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.candidates.iter().map(|e| e.key().clone()).collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
