//! Startup orchestration and the running observatory handle.
//!
//! # Responsibilities
//! - Validate configuration and build every subsystem in dependency order
//! - Register the configured candidates and start their probe cycles
//! - Expose registration, ranking queries, selection and connection tracking
//! - Stop everything in order: probe cycles, publisher, then connection drains
//!
//! # Design Decisions
//! - Fail fast: an invalid configuration never starts anything
//! - Registration writes the table directly so a new candidate is visible at once
//! - Hot reload only touches candidates that came from the config file

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::{validate_config, CandidateConfig, ConfigError, ObservatoryConfig, TargetConfig};
use crate::drain::{DrainHandle, DrainTracker};
use crate::error::{ObservatoryError, ObservatoryResult};
use crate::health::Classifier;
use crate::lifecycle::Shutdown;
use crate::probe::ProbeTarget;
use crate::ranking::publisher::run_publisher;
use crate::ranking::{Availability, CandidateStatus, RankingSnapshot, RankingTable, TableUpdate};
use crate::registry::{Candidate, Registry};
use crate::scheduler::Scheduler;
use crate::selection::Selector;

/// Capacity of the channel between probe cycles and the ranking publisher.
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// What a reconcile pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub replaced: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.replaced.is_empty()
    }
}

struct Inner {
    config: ObservatoryConfig,
    registry: Registry,
    table: Arc<RankingTable>,
    drains: Arc<DrainTracker>,
    selector: Selector,
    scheduler: Scheduler,
    shutdown: Shutdown,
    publisher: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
    started_at: Instant,
}

/// Handle to a running observatory. Cheap to clone.
#[derive(Clone)]
pub struct Observatory {
    inner: Arc<Inner>,
}

impl Observatory {
    /// Validate `config`, start the background tasks and register the configured candidates.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: ObservatoryConfig) -> ObservatoryResult<Self> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let shutdown = Shutdown::new();
        let table = Arc::new(RankingTable::new());
        let drains = Arc::new(DrainTracker::new(config.drain.grace()));
        let selector = Selector::new(
            Arc::clone(&table),
            Arc::clone(&drains),
            config.selector.switch_margin,
        );

        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let publisher = tokio::spawn(run_publisher(
            Arc::clone(&table),
            updates_rx,
            shutdown.subscribe(),
        ));

        let scheduler = Scheduler::new(
            &config.probe,
            Classifier::from_config(&config.classifier),
            updates_tx,
            shutdown.clone(),
        );

        tracing::info!(
            interval_ms = config.probe.interval_ms,
            timeout_ms = config.probe.timeout_ms,
            concurrency = config.probe.concurrency,
            failure_threshold = config.classifier.failure_threshold,
            quality_ceiling_ms = config.classifier.quality_ceiling_ms,
            "Observatory starting"
        );

        let candidates = config.candidates.clone();
        let observatory = Self {
            inner: Arc::new(Inner {
                config,
                registry: Registry::new(),
                table,
                drains,
                selector,
                scheduler,
                shutdown,
                publisher: Mutex::new(Some(publisher)),
                stopped: AtomicBool::new(false),
                started_at: Instant::now(),
            }),
        };

        for candidate in &candidates {
            observatory.register_from_config(candidate)?;
        }

        tracing::info!(candidates = candidates.len(), "Observatory started");
        Ok(observatory)
    }

    /// Register a candidate with a caller-supplied probe target.
    ///
    /// The candidate is ranked as Untested until its first probe completes.
    pub fn register_candidate(&self, tag: &str, target: Arc<dyn ProbeTarget>) -> ObservatoryResult<u64> {
        self.register(tag, target, None)
    }

    /// Register a candidate described by a config entry.
    pub fn register_from_config(&self, candidate: &CandidateConfig) -> ObservatoryResult<u64> {
        let target = candidate
            .target
            .build()
            .map_err(|source| ObservatoryError::InvalidTarget {
                tag: candidate.tag.clone(),
                source,
            })?;
        self.register(&candidate.tag, target, Some(candidate.target.clone()))
    }

    fn register(
        &self,
        tag: &str,
        target: Arc<dyn ProbeTarget>,
        source: Option<TargetConfig>,
    ) -> ObservatoryResult<u64> {
        self.ensure_running()?;
        let inner = &self.inner;
        let candidate = inner.registry.insert_with(tag, target, source, |candidate| {
            inner.table.apply([TableUpdate::Register {
                tag: candidate.tag.clone(),
                generation: candidate.generation,
            }]);
            inner.scheduler.spawn(candidate);
        })?;

        tracing::info!(
            candidate = %candidate.tag,
            generation = candidate.generation,
            target = %candidate.target.describe(),
            "Candidate registered"
        );
        Ok(candidate.generation)
    }

    /// Stop probing `tag` and remove it from the ranking.
    ///
    /// Connections already routed to it are retired, never severed.
    pub fn unregister_candidate(&self, tag: &str) -> ObservatoryResult<()> {
        let inner = &self.inner;
        inner
            .registry
            .remove_with(tag, |candidate| {
                inner.scheduler.cancel(tag);
                inner.table.apply([TableUpdate::Remove {
                    tag: candidate.tag.clone(),
                    generation: candidate.generation,
                }]);
            })
            .ok_or_else(|| ObservatoryError::UnknownCandidate(tag.to_string()))?;

        self.inner.selector.release(tag);
        let retired = self.inner.drains.retire(tag);

        tracing::info!(candidate = %tag, retired_connections = retired, "Candidate unregistered");
        Ok(())
    }

    /// Bring the config-sourced candidates in line with `desired`.
    ///
    /// Candidates registered programmatically are left alone unless `desired`
    /// names the same tag. Nothing changes if any desired target is invalid.
    pub fn reconcile(&self, desired: &[CandidateConfig]) -> ObservatoryResult<ReconcileReport> {
        self.ensure_running()?;

        let mut wanted = HashMap::with_capacity(desired.len());
        for candidate in desired {
            candidate
                .target
                .check()
                .map_err(|source| ObservatoryError::InvalidTarget {
                    tag: candidate.tag.clone(),
                    source,
                })?;
            wanted.insert(candidate.tag.as_str(), candidate);
        }

        let mut report = ReconcileReport::default();

        for tag in self.inner.registry.tags() {
            let Some(current) = self.inner.registry.get(&tag) else {
                continue;
            };
            match wanted.get(tag.as_str()) {
                None if current.source.is_some() => {
                    self.unregister_candidate(&tag)?;
                    report.removed.push(tag);
                }
                Some(next) if current.source.as_ref() != Some(&next.target) => {
                    self.unregister_candidate(&tag)?;
                    self.register_from_config(next)?;
                    report.replaced.push(tag);
                }
                _ => {}
            }
        }

        for candidate in desired {
            if !self.inner.registry.contains(&candidate.tag) {
                self.register_from_config(candidate)?;
                report.added.push(candidate.tag.clone());
            }
        }

        if !report.is_empty() {
            tracing::info!(
                added = ?report.added,
                removed = ?report.removed,
                replaced = ?report.replaced,
                "Candidate set reconciled"
            );
        }
        Ok(report)
    }

    /// Latest status of `tag`, if registered.
    pub fn status(&self, tag: &str) -> Option<CandidateStatus> {
        self.inner.table.snapshot().get(tag).cloned()
    }

    /// The whole current ranking.
    pub fn ranking(&self) -> Arc<RankingSnapshot> {
        self.inner.table.snapshot()
    }

    /// The best `n` candidates in ranking order.
    pub fn select(&self, n: usize) -> Vec<CandidateStatus> {
        self.inner.selector.select(n)
    }

    /// The candidate new connections should use, applying switch hysteresis.
    pub fn select_best(&self) -> Option<CandidateStatus> {
        self.inner.selector.select_best()
    }

    pub fn availability(&self) -> Availability {
        self.inner.selector.availability()
    }

    /// Tag of the currently held best, without re-evaluating.
    pub fn held_best(&self) -> Option<String> {
        self.inner.selector.held_best()
    }

    /// Start tracking a connection routed to `tag`.
    pub fn open_connection(&self, tag: &str) -> ObservatoryResult<DrainHandle> {
        self.ensure_running()?;
        if !self.inner.registry.contains(tag) {
            return Err(ObservatoryError::UnknownCandidate(tag.to_string()));
        }
        Ok(self.inner.drains.open(tag))
    }

    /// Registered candidates, sorted by tag.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.inner
            .registry
            .tags()
            .iter()
            .filter_map(|tag| self.inner.registry.get(tag))
            .collect()
    }

    pub fn open_connections(&self) -> usize {
        self.inner.drains.open_count()
    }

    pub fn probes_in_flight(&self) -> usize {
        self.inner.scheduler.in_flight()
    }

    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    pub fn config(&self) -> &ObservatoryConfig {
        &self.inner.config
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Resolves once [`Observatory::stop`] has been called.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.inner.shutdown.subscribe()
    }

    /// Stop probing, flush the ranking publisher and drain open connections.
    ///
    /// Returns the number of connections force-closed after the grace period.
    /// Only the first call does any work.
    pub async fn stop(&self) -> usize {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return 0;
        }
        tracing::info!("Observatory stopping");

        self.inner.shutdown.trigger();
        self.inner.scheduler.join().await;

        let publisher = self
            .inner
            .publisher
            .lock()
            .expect("publisher mutex poisoned")
            .take();
        if let Some(publisher) = publisher {
            if let Err(e) = publisher.await {
                tracing::error!(error = %e, "Ranking publisher task failed");
            }
        }

        let forced = self.inner.drains.shutdown().await;
        tracing::info!(force_closed = forced, "Observatory stopped");
        forced
    }

    fn ensure_running(&self) -> ObservatoryResult<()> {
        if self.is_stopped() {
            Err(ObservatoryError::Stopped)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for Observatory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observatory")
            .field("candidates", &self.inner.registry.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
