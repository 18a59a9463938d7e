//! Message broker between foreground pages and the sync core. Commands are
//! tried against the network first; failures fall back to the durable queue
//! plus a deferred-retry registration. Outcome events are broadcast to every
//! currently-attached listener.

use crate::error::{DriftError, Result};
use crate::platform::{Fetcher, RetryScheduler};
use crate::store::QueueStore;
use crate::types::{ClientCommand, ClientEvent, Partition, Post};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// What became of a foreground command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The network attempt succeeded and listeners were notified.
    Delivered,
    /// The network attempt failed; the request is durably queued and a
    /// retry is registered with the host.
    Queued { id: u64 },
    /// Queued, but the retry registration itself failed. The entry stays
    /// queued and is picked up at the next organic retry opportunity.
    QueuedUnscheduled { id: u64 },
}

pub struct MessageBroker {
    /// `None` when the durable store could not be opened. Immediate network
    /// attempts and notifications still function; only queueing degrades.
    store: Option<Arc<QueueStore>>,
    fetcher: Arc<dyn Fetcher>,
    scheduler: Arc<dyn RetryScheduler>,
    listeners: DashMap<u64, mpsc::UnboundedSender<ClientEvent>>,
    next_listener_id: AtomicU64,
}

impl MessageBroker {
    pub fn new(
        store: Option<Arc<QueueStore>>,
        fetcher: Arc<dyn Fetcher>,
        scheduler: Arc<dyn RetryScheduler>,
    ) -> Self {
        MessageBroker {
            store,
            fetcher,
            scheduler,
            listeners: DashMap::new(),
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// Register a foreground listener. Events flow until the receiver is
    /// dropped or `detach` is called; listeners that attach later only see
    /// later events and must request state themselves.
    pub fn attach(&self) -> (u64, mpsc::UnboundedReceiver<ClientEvent>) {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.insert(id, tx);
        (id, rx)
    }

    pub fn detach(&self, listener_id: u64) {
        self.listeners.remove(&listener_id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Broadcast to all attached listeners, pruning any whose channel has
    /// closed.
    pub fn notify_all(&self, event: ClientEvent) {
        self.listeners.retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    fn notify_one(&self, listener_id: u64, event: ClientEvent) -> bool {
        match self.listeners.get(&listener_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Dispatch a decoded foreground command.
    pub async fn handle(&self, listener_id: u64, command: ClientCommand) -> Result<()> {
        match command {
            ClientCommand::SendPost { url } => {
                self.handle_send_post(&url).await?;
            }
            ClientCommand::GetPosts { url } => {
                self.handle_get_posts(&url).await?;
            }
            ClientCommand::WaitingPosts => {
                self.handle_waiting_posts(listener_id)?;
            }
        }
        Ok(())
    }

    /// Try to deliver a new post now; queue it for replay on failure.
    pub async fn handle_send_post(&self, url: &str) -> Result<CommandOutcome> {
        match self.fetcher.fetch(url).await {
            Ok(response) if response.ok() => {
                self.notify_all(ClientEvent::PostsSent);
                Ok(CommandOutcome::Delivered)
            }
            Ok(response) => {
                tracing::warn!("Send-post to {} returned status {}", url, response.status);
                self.queue_for_retry(Partition::OutboundPosts, url).await
            }
            Err(e) => {
                tracing::info!("Send-post to {} failed ({}), queueing", url, e);
                self.queue_for_retry(Partition::OutboundPosts, url).await
            }
        }
    }

    /// Try to refresh the feed now; queue the read for replay on failure.
    /// The success path never touches the store.
    pub async fn handle_get_posts(&self, url: &str) -> Result<CommandOutcome> {
        match self.fetcher.fetch(url).await {
            Ok(response) if response.ok() => {
                let posts: Vec<Post> = response.json()?;
                self.notify_all(ClientEvent::GotPosts { posts });
                Ok(CommandOutcome::Delivered)
            }
            Ok(response) => {
                tracing::warn!("Get-posts from {} returned status {}", url, response.status);
                self.queue_for_retry(Partition::PendingReads, url).await
            }
            Err(e) => {
                tracing::info!("Get-posts from {} failed ({}), queueing", url, e);
                self.queue_for_retry(Partition::PendingReads, url).await
            }
        }
    }

    /// Point-to-point reply with the URLs still waiting in the outbound
    /// partition, so a freshly attached page can render its pending posts.
    pub fn handle_waiting_posts(&self, listener_id: u64) -> Result<()> {
        let Some(store) = &self.store else {
            return Err(DriftError::StorageUnavailable(
                "durable queue is not open".to_string(),
            ));
        };
        let urls = store.urls(Partition::OutboundPosts)?;
        if !self.notify_one(listener_id, ClientEvent::WaitingPosts { urls }) {
            tracing::warn!(
                "Listener {} detached before waiting-posts reply",
                listener_id
            );
        }
        Ok(())
    }

    async fn queue_for_retry(&self, partition: Partition, url: &str) -> Result<CommandOutcome> {
        let Some(store) = &self.store else {
            return Err(DriftError::StorageUnavailable(
                "durable queue is not open".to_string(),
            ));
        };
        let id = store.enqueue(partition, url)?;
        match self.scheduler.register(partition.retry_tag()).await {
            Ok(()) => Ok(CommandOutcome::Queued { id }),
            Err(e) => {
                // Entry stays queued; the next organic retry signal will
                // pick it up.
                tracing::warn!(
                    "Retry registration for {} failed: {}",
                    partition.retry_tag(),
                    e
                );
                Ok(CommandOutcome::QueuedUnscheduled { id })
            }
        }
    }
}

impl std::fmt::Debug for MessageBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBroker")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
