//! Per-candidate probe cycles.
//!
//! # Responsibilities
//! - Run one independent, jittered probe loop per registered candidate
//! - Cap probes in flight across all candidates with a semaphore
//! - Own the candidate's health record and push every result to the ranking publisher
//! - Stop on unregistration or global shutdown, abandoning any in-flight probe

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::ProbeConfig;
use crate::health::{CandidateHealth, Classifier, StateLabel};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::probe::{ProbeResult, ProbeTarget, Prober};
use crate::ranking::{CandidateStatus, TableUpdate};
use crate::registry::Candidate;
use crate::scheduler::jitter;

/// Settings shared by every cycle.
#[derive(Clone)]
struct CycleSettings {
    prober: Prober,
    classifier: Classifier,
    interval: Duration,
    jitter_ratio: f64,
    permits: Arc<Semaphore>,
    updates: mpsc::Sender<TableUpdate>,
}

struct RunningCycle {
    generation: u64,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drives periodic probing of all registered candidates.
pub struct Scheduler {
    settings: CycleSettings,
    concurrency: usize,
    shutdown: Shutdown,
    cycles: DashMap<String, RunningCycle>,
}

impl Scheduler {
    pub fn new(
        config: &ProbeConfig,
        classifier: Classifier,
        updates: mpsc::Sender<TableUpdate>,
        shutdown: Shutdown,
    ) -> Self {
        let concurrency = config.concurrency.max(1);
        Self {
            settings: CycleSettings {
                prober: Prober::new(config.timeout()),
                classifier,
                interval: config.interval(),
                jitter_ratio: config.jitter_ratio,
                permits: Arc::new(Semaphore::new(concurrency)),
                updates,
            },
            concurrency,
            shutdown,
            cycles: DashMap::new(),
        }
    }

    /// Start probing `candidate`. Replaces any cycle running under the same tag.
    pub fn spawn(&self, candidate: &Candidate) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_cycle(
            self.settings.clone(),
            candidate.tag.clone(),
            candidate.generation,
            Arc::clone(&candidate.target),
            stop_rx,
            self.shutdown.subscribe(),
        ));

        let running = RunningCycle {
            generation: candidate.generation,
            stop: stop_tx,
            task,
        };
        if let Some(previous) = self.cycles.insert(candidate.tag.clone(), running) {
            let _ = previous.stop.send(true);
        }
    }

    /// Stop probing `tag`. Returns false if no cycle was running.
    pub fn cancel(&self, tag: &str) -> bool {
        match self.cycles.remove(tag) {
            Some((_, cycle)) => {
                let _ = cycle.stop.send(true);
                tracing::debug!(candidate = %tag, generation = cycle.generation, "Probe cycle cancelled");
                true
            }
            None => false,
        }
    }

    /// Number of running cycles.
    pub fn active(&self) -> usize {
        self.cycles.len()
    }

    /// Probes currently holding a concurrency permit.
    pub fn in_flight(&self) -> usize {
        self.concurrency - self.settings.permits.available_permits()
    }

    /// Stop every cycle and wait for the tasks to exit.
    pub async fn join(&self) {
        let tags: Vec<String> = self.cycles.iter().map(|entry| entry.key().clone()).collect();
        for tag in tags {
            if let Some((_, cycle)) = self.cycles.remove(&tag) {
                let _ = cycle.stop.send(true);
                if let Err(e) = cycle.task.await {
                    tracing::error!(candidate = %tag, error = %e, "Probe cycle task failed");
                }
            }
        }
    }
}

async fn run_cycle(
    settings: CycleSettings,
    tag: String,
    generation: u64,
    target: Arc<dyn ProbeTarget>,
    mut stop: watch::Receiver<bool>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut health = CandidateHealth::new();
    let mut delay = jitter::initial_delay(settings.interval, settings.jitter_ratio);

    tracing::debug!(candidate = %tag, target = %target.describe(), "Probe cycle starting");

    loop {
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = stop.changed() => break,
            _ = shutdown.recv() => break,
        }
        delay = jitter::jittered_interval(settings.interval, settings.jitter_ratio);

        // Queue for a permit, but never longer than one interval.
        let permit = tokio::select! {
            acquired = time::timeout(settings.interval, settings.permits.clone().acquire_owned()) => match acquired {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => break,
                Err(_) => {
                    tracing::warn!(candidate = %tag, "Probe skipped, concurrency limit saturated");
                    metrics::record_probe_skipped(&tag);
                    continue;
                }
            },
            _ = stop.changed() => break,
            _ = shutdown.recv() => break,
        };

        let result = tokio::select! {
            result = settings.prober.probe(target.as_ref()) => result,
            _ = stop.changed() => break,
            _ = shutdown.recv() => break,
        };
        drop(permit);

        metrics::record_probe(&tag, &result);
        let transition = settings.classifier.observe(&mut health, &result);
        metrics::record_candidate_state(&tag, transition.to);

        if transition.changed() {
            match (&result, transition.to) {
                (ProbeResult::Failure(reason), StateLabel::Failed) => tracing::warn!(
                    candidate = %tag,
                    from = %transition.from,
                    failures = health.consecutive_failures,
                    reason = %reason,
                    "Candidate failed"
                ),
                _ => tracing::info!(
                    candidate = %tag,
                    from = %transition.from,
                    to = %transition.to,
                    rtt = ?health.state.measured(),
                    "Candidate state changed"
                ),
            }
        }

        let status = CandidateStatus::from_health(tag.clone(), generation, &health);
        tokio::select! {
            sent = settings.updates.send(TableUpdate::Observe(status)) => {
                if sent.is_err() {
                    break;
                }
            }
            _ = stop.changed() => break,
            _ = shutdown.recv() => break,
        }
    }

    tracing::debug!(candidate = %tag, "Probe cycle stopped");
}
