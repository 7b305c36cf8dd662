//! Background task folding classifier results into the ranking table.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::ranking::table::{RankingTable, TableUpdate};

/// Upper bound on updates folded into one published snapshot.
pub const MAX_BATCH: usize = 256;

/// Receive updates and publish one snapshot per batch until shutdown.
///
/// Updates already queued when shutdown fires are still applied.
pub async fn run_publisher(
    table: Arc<RankingTable>,
    mut updates: mpsc::Receiver<TableUpdate>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::debug!("Ranking publisher starting");

    loop {
        let first = tokio::select! {
            update = updates.recv() => match update {
                Some(update) => update,
                None => break,
            },
            _ = shutdown.recv() => {
                let mut rest = Vec::new();
                while let Ok(update) = updates.try_recv() {
                    rest.push(update);
                }
                if !rest.is_empty() {
                    table.apply(rest);
                }
                break;
            }
        };

        let mut batch = Vec::with_capacity(16);
        batch.push(first);
        while batch.len() < MAX_BATCH {
            match updates.try_recv() {
                Ok(update) => batch.push(update),
                Err(_) => break,
            }
        }

        let size = batch.len();
        if table.apply(batch) {
            tracing::trace!(batch = size, version = table.snapshot().version(), "Ranking published");
        }
    }

    tracing::debug!("Ranking publisher stopped");
}
