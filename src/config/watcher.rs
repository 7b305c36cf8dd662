//! Configuration file watcher for hot reload of the candidate set.
//!
//! Editors and `notify` backends often report several events for one save.
//! Each event reloads and validates the file, but a new candidate set is only
//! sent when it differs from the last one sent. Tunables are fixed at start,
//! so edits to them are reported and otherwise ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{CandidateConfig, ObservatoryConfig};

/// What a reload changed relative to the previous accepted config.
#[derive(Debug, Default, PartialEq)]
pub struct ReloadDiff {
    /// The new candidate set, if it changed.
    pub candidates: Option<Vec<CandidateConfig>>,
    /// Whether any setting other than the candidate set changed.
    pub tunables_changed: bool,
}

/// Remembers the last accepted config and diffs reloads against it.
#[derive(Debug)]
pub struct ReloadGate {
    candidates: Vec<CandidateConfig>,
    tunables: Value,
}

impl ReloadGate {
    pub fn new(config: &ObservatoryConfig) -> Self {
        Self {
            candidates: sorted_candidates(config),
            tunables: tunables(config),
        }
    }

    /// Diff `next` against the last accepted config and remember it.
    pub fn admit(&mut self, next: &ObservatoryConfig) -> ReloadDiff {
        let candidates = sorted_candidates(next);
        let tunables = tunables(next);

        let diff = ReloadDiff {
            candidates: (candidates != self.candidates).then(|| next.candidates.clone()),
            tunables_changed: tunables != self.tunables,
        };
        self.candidates = candidates;
        self.tunables = tunables;
        diff
    }
}

fn sorted_candidates(config: &ObservatoryConfig) -> Vec<CandidateConfig> {
    let mut candidates = config.candidates.clone();
    candidates.sort_by(|a, b| a.tag.cmp(&b.tag));
    candidates
}

fn tunables(config: &ObservatoryConfig) -> Value {
    let mut value = serde_json::to_value(config).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.remove("candidates");
    }
    value
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    gate: ReloadGate,
    update_tx: mpsc::UnboundedSender<Vec<CandidateConfig>>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, diffing against the running `current` config.
    ///
    /// Returns the watcher and a receiver of changed candidate sets.
    pub fn new(
        path: &Path,
        current: &ObservatoryConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<CandidateConfig>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                gate: ReloadGate::new(current),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut gate,
            update_tx,
        } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let next = match load_config(&path) {
                        Ok(next) => next,
                        Err(e) => {
                            tracing::error!(error = %e, "Rejected config reload, keeping current candidate set");
                            return;
                        }
                    };

                    let diff = gate.admit(&next);
                    if diff.tunables_changed {
                        tracing::warn!("Config reload changed settings other than candidates; restart to apply them");
                    }
                    match diff.candidates {
                        Some(candidates) => {
                            tracing::info!(candidates = candidates.len(), "Candidate set changed on disk");
                            let _ = update_tx.send(candidates);
                        }
                        None => tracing::debug!("Config file touched, candidate set unchanged"),
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watched, "Config watcher started");
        Ok(watcher)
    }
}
