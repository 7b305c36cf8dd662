//! Drain tracking per candidate.
//!
//! # Responsibilities
//! - Hand out drain handles for connections routed to a candidate
//! - Mark a candidate's connections draining on demotion, retired on removal
//! - Bound shutdown: wait for open connections, then force-close the rest

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::drain::handle::{ConnectionId, DrainHandle, DrainPhase, HandleState};

/// Poll interval while waiting for connections to finish on shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct OpenConnection {
    tag: String,
    state: Arc<HandleState>,
}

/// Tracks every open [`DrainHandle`].
#[derive(Debug)]
pub struct DrainTracker {
    open: DashMap<ConnectionId, OpenConnection>,
    next_id: AtomicU64,
    force_close: watch::Sender<bool>,
    grace: Duration,
}

impl DrainTracker {
    pub fn new(grace: Duration) -> Self {
        let (force_close, _) = watch::channel(false);
        Self {
            open: DashMap::new(),
            next_id: AtomicU64::new(1),
            force_close,
            grace,
        }
    }

    /// Register a connection routed to candidate `tag`.
    pub fn open(self: &Arc<Self>, tag: &str) -> DrainHandle {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let state = Arc::new(HandleState::new());
        self.open.insert(
            id,
            OpenConnection {
                tag: tag.to_string(),
                state: Arc::clone(&state),
            },
        );
        tracing::trace!(connection_id = %id, candidate = %tag, "Connection opened");
        DrainHandle::new(id, tag.to_string(), state, Arc::clone(self), self.force_close.subscribe())
    }

    pub(crate) fn release(&self, id: ConnectionId) {
        if self.open.remove(&id).is_some() {
            tracing::trace!(connection_id = %id, "Connection released");
        }
    }

    /// Number of open connections across all candidates.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Number of open connections routed to `tag`.
    pub fn open_for(&self, tag: &str) -> usize {
        self.open.iter().filter(|entry| entry.tag == tag).count()
    }

    /// Candidate lost the held-best position.
    pub fn mark_draining(&self, tag: &str) -> usize {
        let marked = self.advance_all(tag, DrainPhase::Draining);
        if marked > 0 {
            tracing::info!(candidate = %tag, connections = marked, "Draining connections of demoted candidate");
        }
        marked
    }

    /// Candidate was unregistered.
    pub fn retire(&self, tag: &str) -> usize {
        let retired = self.advance_all(tag, DrainPhase::Retired);
        if retired > 0 {
            tracing::info!(candidate = %tag, connections = retired, "Retiring connections of removed candidate");
        }
        retired
    }

    fn advance_all(&self, tag: &str, phase: DrainPhase) -> usize {
        self.open
            .iter()
            .filter(|entry| entry.tag == tag)
            .filter(|entry| entry.state.advance(phase))
            .count()
    }

    /// Wait up to the grace period for open connections, then force-close the rest.
    ///
    /// Returns the number of connections that were force-closed.
    pub async fn shutdown(&self) -> usize {
        let deadline = Instant::now() + self.grace;
        while !self.open.is_empty() && Instant::now() < deadline {
            time::sleep(SHUTDOWN_POLL).await;
        }

        let mut forced = 0;
        for entry in self.open.iter() {
            if entry.state.advance(DrainPhase::ForceClosed) {
                forced += 1;
            }
        }
        self.force_close.send_replace(true);

        if forced > 0 {
            tracing::warn!(connections = forced, grace = ?self.grace, "Force-closing connections after drain grace period");
        }
        forced
    }
}
