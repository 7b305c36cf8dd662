//! Per-connection drain handles.
//!
//! # Responsibilities
//! - Account bytes the consumer has already read (`acknowledge_receive`)
//! - Flush the remaining bytes of a reader at teardown (`drain`)
//! - Unregister from the tracker when dropped
//!
//! # Design Decisions
//! - `drain` consumes the handle, so it runs at most once per connection
//! - A failed drain is never retried; the handle is force-closed
//! - Acknowledged and drained bytes are counted separately

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;

use crate::drain::tracker::DrainTracker;
use crate::observability::metrics;

/// The drain contract consumed by the connection layer.
pub trait Drainer {
    /// Record `size` bytes as read by the consumer. Never blocks.
    fn acknowledge_receive(&self, size: usize);

    /// Read and discard everything left in `reader` until EOF or error.
    fn drain<R>(self, reader: R) -> impl Future<Output = Result<DrainSummary, DrainError>> + Send
    where
        R: AsyncRead + Unpin + Send;
}

/// Error returned by a drain.
#[derive(Debug, Error)]
pub enum DrainError {
    #[error("drain read failed: {0}")]
    Io(#[from] io::Error),

    #[error("connection force-closed before drain completed")]
    ForceClosed,
}

/// Byte accounting of a finished drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    /// Bytes acknowledged by the consumer before teardown.
    pub acknowledged: u64,
    /// Bytes flushed by the drain itself.
    pub drained: u64,
}

/// Lifecycle of a connection bound to a candidate.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainPhase {
    /// Candidate is still the selected best.
    Active = 0,
    /// Candidate was demoted; connection finishes naturally.
    Draining = 1,
    /// Candidate was unregistered.
    Retired = 2,
    /// Connection was closed without completing its drain.
    ForceClosed = 3,
}

impl From<u8> for DrainPhase {
    fn from(val: u8) -> Self {
        match val {
            1 => DrainPhase::Draining,
            2 => DrainPhase::Retired,
            3 => DrainPhase::ForceClosed,
            _ => DrainPhase::Active,
        }
    }
}

/// Unique identifier for a tracked connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// State shared between a handle and its tracker.
#[derive(Debug)]
pub(crate) struct HandleState {
    acknowledged: AtomicU64,
    phase: AtomicU8,
}

impl HandleState {
    pub(crate) fn new() -> Self {
        Self {
            acknowledged: AtomicU64::new(0),
            phase: AtomicU8::new(DrainPhase::Active as u8),
        }
    }

    pub(crate) fn phase(&self) -> DrainPhase {
        DrainPhase::from(self.phase.load(Ordering::Acquire))
    }

    /// Move to `next` unless the handle is already in a later phase.
    pub(crate) fn advance(&self, next: DrainPhase) -> bool {
        let mut current = self.phase.load(Ordering::Acquire);
        loop {
            if current >= next as u8 {
                return false;
            }
            match self.phase.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// One in-flight connection bound to a candidate.
///
/// Dropping the handle removes it from its tracker.
pub struct DrainHandle {
    id: ConnectionId,
    tag: String,
    state: Arc<HandleState>,
    tracker: Arc<DrainTracker>,
    force_close: watch::Receiver<bool>,
}

impl DrainHandle {
    pub(crate) fn new(
        id: ConnectionId,
        tag: String,
        state: Arc<HandleState>,
        tracker: Arc<DrainTracker>,
        force_close: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            tag,
            state,
            tracker,
            force_close,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Tag of the candidate this connection was routed to.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn phase(&self) -> DrainPhase {
        self.state.phase()
    }

    /// Bytes acknowledged so far.
    pub fn acknowledged(&self) -> u64 {
        self.state.acknowledged.load(Ordering::Acquire)
    }

    /// Copy everything left in `reader` into `writer` instead of discarding it.
    pub async fn drain_into<R, W>(self, mut reader: R, mut writer: W) -> Result<DrainSummary, DrainError>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut force_close = self.force_close.clone();
        let copied = tokio::select! {
            copied = tokio::io::copy(&mut reader, &mut writer) => Some(copied),
            _ = wait_force_close(&mut force_close) => None,
        };
        match copied {
            Some(copied) => self.finish(copied),
            None => Err(self.fail_forced()),
        }
    }

    fn finish(self, copied: io::Result<u64>) -> Result<DrainSummary, DrainError> {
        match copied {
            Ok(drained) => {
                let summary = DrainSummary {
                    acknowledged: self.acknowledged(),
                    drained,
                };
                metrics::record_drain(&self.tag, summary.drained);
                tracing::debug!(
                    connection_id = %self.id,
                    candidate = %self.tag,
                    acknowledged = summary.acknowledged,
                    drained = summary.drained,
                    "Connection drained"
                );
                Ok(summary)
            }
            Err(e) => {
                self.state.advance(DrainPhase::ForceClosed);
                metrics::record_drain_error(&self.tag);
                tracing::warn!(
                    connection_id = %self.id,
                    candidate = %self.tag,
                    error = %e,
                    "Drain failed, force-closing connection"
                );
                Err(DrainError::Io(e))
            }
        }
    }

    fn fail_forced(self) -> DrainError {
        self.state.advance(DrainPhase::ForceClosed);
        metrics::record_drain_error(&self.tag);
        tracing::warn!(connection_id = %self.id, candidate = %self.tag, "Drain interrupted by force close");
        DrainError::ForceClosed
    }
}

impl Drainer for DrainHandle {
    fn acknowledge_receive(&self, size: usize) {
        self.state.acknowledged.fetch_add(size as u64, Ordering::AcqRel);
    }

    fn drain<R>(self, reader: R) -> impl Future<Output = Result<DrainSummary, DrainError>> + Send
    where
        R: AsyncRead + Unpin + Send,
    {
        self.drain_into(reader, tokio::io::sink())
    }
}

impl fmt::Debug for DrainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainHandle")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("phase", &self.phase())
            .field("acknowledged", &self.acknowledged())
            .finish()
    }
}

impl Drop for DrainHandle {
    fn drop(&mut self) {
        self.tracker.release(self.id);
    }
}

async fn wait_force_close(rx: &mut watch::Receiver<bool>) {
    loop {
        let closed = *rx.borrow_and_update();
        if closed {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
