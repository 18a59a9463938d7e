//! Drains a durable partition when the host fires a deferred-retry signal.
//! The snapshot taken at drain start is replayed concurrently; each entry
//! succeeds or fails on its own, and an entry is removed only after its
//! replay is confirmed. Entries enqueued mid-drain wait for the next signal.

use crate::broker::MessageBroker;
use crate::error::{DriftError, Result};
use crate::platform::{FetchResponse, Fetcher};
use crate::store::QueueStore;
use crate::types::{ClientEvent, Partition, Post, QueueEntry, RetryTag};
use std::sync::Arc;

/// Aggregate outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

enum ReplayOutcome {
    Delivered(QueueEntry, FetchResponse),
    /// Another drain confirmed this entry first; nothing left to do.
    AlreadyGone,
    Failed(QueueEntry, DriftError),
}

pub struct SyncCoordinator {
    store: Arc<QueueStore>,
    fetcher: Arc<dyn Fetcher>,
    broker: Arc<MessageBroker>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<QueueStore>,
        fetcher: Arc<dyn Fetcher>,
        broker: Arc<MessageBroker>,
    ) -> Self {
        SyncCoordinator {
            store,
            fetcher,
            broker,
        }
    }

    /// Replay every entry currently in the partition named by `tag`.
    /// Re-entrant and idempotent: a drain of an empty partition is a no-op
    /// with no notification and no store mutation.
    pub async fn drain(&self, tag: RetryTag) -> Result<DrainReport> {
        let partition = tag.partition();
        let snapshot = self.store.list_all(partition)?;
        if snapshot.is_empty() {
            return Ok(DrainReport::default());
        }

        tracing::info!("Draining {} ({} entries)", partition, snapshot.len());

        let mut handles = Vec::with_capacity(snapshot.len());
        for entry in snapshot {
            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            handles.push(tokio::spawn(replay_entry(store, fetcher, partition, entry)));
        }

        // Awaiting in spawn order keeps delivered responses in insertion
        // order for the aggregate notification.
        let mut report = DrainReport::default();
        let mut delivered: Vec<(QueueEntry, FetchResponse)> = Vec::new();
        for handle in handles {
            report.attempted += 1;
            match handle.await {
                Ok(ReplayOutcome::Delivered(entry, response)) => {
                    report.delivered += 1;
                    delivered.push((entry, response));
                }
                Ok(ReplayOutcome::AlreadyGone) => {
                    report.delivered += 1;
                }
                Ok(ReplayOutcome::Failed(entry, e)) => {
                    report.failed += 1;
                    tracing::warn!(
                        "Replay of entry {} ({}) failed, left queued: {}",
                        entry.id,
                        entry.url,
                        e
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Replay task panicked: {}", e);
                }
            }
        }

        if report.delivered > 0 {
            match tag {
                RetryTag::SendPosts => self.broker.notify_all(ClientEvent::PostsSent),
                RetryTag::GetPosts => {
                    let posts = collect_posts(&delivered);
                    self.broker.notify_all(ClientEvent::GotPosts { posts });
                }
            }
        }

        tracing::info!(
            "Drain of {} done: {} delivered, {} failed",
            partition,
            report.delivered,
            report.failed
        );
        Ok(report)
    }
}

/// Fetch one queued request and, only after a confirmed 2xx, remove it from
/// the store. Removal before confirmation would risk losing the entry.
async fn replay_entry(
    store: Arc<QueueStore>,
    fetcher: Arc<dyn Fetcher>,
    partition: Partition,
    entry: QueueEntry,
) -> ReplayOutcome {
    match fetcher.fetch(&entry.url).await {
        Ok(response) if response.ok() => match store.remove(partition, entry.id) {
            Ok(()) => ReplayOutcome::Delivered(entry, response),
            Err(DriftError::EntryNotFound { .. }) => ReplayOutcome::AlreadyGone,
            Err(e) => ReplayOutcome::Failed(entry, e),
        },
        Ok(response) => {
            let reason = format!("status {}", response.status);
            ReplayOutcome::Failed(
                entry.clone(),
                DriftError::DeliveryFailed {
                    id: entry.id,
                    url: entry.url,
                    reason,
                },
            )
        }
        Err(e) => {
            let reason = e.to_string();
            ReplayOutcome::Failed(
                entry.clone(),
                DriftError::DeliveryFailed {
                    id: entry.id,
                    url: entry.url,
                    reason,
                },
            )
        }
    }
}

/// Parse each succeeded response body as a post list and concatenate in
/// entry order. Bodies that fail to parse are logged and skipped.
fn collect_posts(delivered: &[(QueueEntry, FetchResponse)]) -> Vec<Post> {
    let mut posts = Vec::new();
    for (entry, response) in delivered {
        match response.json::<Vec<Post>>() {
            Ok(mut parsed) => posts.append(&mut parsed),
            Err(e) => {
                tracing::warn!("Unparseable feed body from {}: {}", entry.url, e);
            }
        }
    }
    posts
}
