//! Ties the store, cache, coordinator and broker into the event surface the
//! host platform drives: install, activate, fetch interception, foreground
//! messages, and deferred-retry signals.

use crate::broker::MessageBroker;
use crate::cache::{CacheLifecycle, ResponseCache, StrategyRouter};
use crate::config::WorkerConfig;
use crate::error::{DriftError, Result};
use crate::platform::{FetchResponse, Fetcher, HttpFetcher, RetryScheduler};
use crate::store::QueueStore;
use crate::sync::{DrainReport, SyncCoordinator};
use crate::types::{ClientCommand, ClientEvent, RetryTag};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

static GLOBAL_WORKER: OnceCell<Arc<SyncWorker>> = OnceCell::new();

/// Single-flight open of the process-wide worker: the first caller opens it,
/// every later caller reuses the same handle.
pub fn global_or_open(
    config: WorkerConfig,
    fetcher: Arc<dyn Fetcher>,
    scheduler: Arc<dyn RetryScheduler>,
) -> Result<Arc<SyncWorker>> {
    GLOBAL_WORKER
        .get_or_try_init(|| SyncWorker::open(config, fetcher, scheduler))
        .map(Arc::clone)
}

/// The already-open global worker, if any.
pub fn global_worker() -> Option<Arc<SyncWorker>> {
    GLOBAL_WORKER.get().map(Arc::clone)
}

pub struct SyncWorker {
    config: WorkerConfig,
    store: Option<Arc<QueueStore>>,
    router: StrategyRouter,
    lifecycle: CacheLifecycle,
    broker: Arc<MessageBroker>,
    coordinator: Option<SyncCoordinator>,
}

impl SyncWorker {
    /// Wire up a worker from its collaborators. A durable-store failure is
    /// not fatal: caching and immediate network attempts keep working, and
    /// queue-backed operations report `StorageUnavailable` to their callers.
    pub fn open(
        config: WorkerConfig,
        fetcher: Arc<dyn Fetcher>,
        scheduler: Arc<dyn RetryScheduler>,
    ) -> Result<Arc<Self>> {
        let cache = Arc::new(ResponseCache::open(&config.cache_root, &config.cache_name)?);

        let store = match QueueStore::open(&config.data_dir) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                tracing::error!("Durable queue unavailable, offline queueing disabled: {}", e);
                None
            }
        };

        let broker = Arc::new(MessageBroker::new(
            store.clone(),
            Arc::clone(&fetcher),
            scheduler,
        ));
        let coordinator = store.clone().map(|store| {
            SyncCoordinator::new(store, Arc::clone(&fetcher), Arc::clone(&broker))
        });
        let router = StrategyRouter::new(
            config.assets.clone(),
            Arc::clone(&cache),
            Arc::clone(&fetcher),
        );
        let lifecycle = CacheLifecycle::new(
            config.cache_root.clone(),
            config.cache_prefix.clone(),
            config.assets.clone(),
            cache,
            fetcher,
        );

        Ok(Arc::new(SyncWorker {
            config,
            store,
            router,
            lifecycle,
            broker,
            coordinator,
        }))
    }

    /// Convenience open with the production reqwest-backed fetcher.
    pub fn open_with_http(
        config: WorkerConfig,
        scheduler: Arc<dyn RetryScheduler>,
    ) -> Result<Arc<Self>> {
        let timeout = Duration::from_secs(config.fetch_timeout_secs);
        Self::open(config, Arc::new(HttpFetcher::new(timeout)), scheduler)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&Arc<QueueStore>> {
        self.store.as_ref()
    }

    pub fn broker(&self) -> &Arc<MessageBroker> {
        &self.broker
    }

    /// Install-time cache population.
    pub async fn on_install(&self) -> Result<usize> {
        self.lifecycle.install().await
    }

    /// Activation: this instance now owns the cache; evict prior generations.
    pub fn on_activate(&self) -> Result<usize> {
        self.lifecycle.activate()
    }

    /// Static-resource interception. Data-request URLs never come through
    /// here; the host routes those as foreground commands instead.
    pub async fn on_fetch(&self, url: &str) -> Result<FetchResponse> {
        self.router.route(url).await
    }

    /// A decoded foreground command from listener `listener_id`.
    pub async fn on_message(&self, listener_id: u64, command: ClientCommand) -> Result<()> {
        self.broker.handle(listener_id, command).await
    }

    /// A deferred-retry signal from the host.
    pub async fn on_sync(&self, tag: RetryTag) -> Result<DrainReport> {
        match &self.coordinator {
            Some(coordinator) => coordinator.drain(tag).await,
            None => Err(DriftError::StorageUnavailable(
                "durable queue is not open".to_string(),
            )),
        }
    }

    pub fn attach(&self) -> (u64, mpsc::UnboundedReceiver<ClientEvent>) {
        self.broker.attach()
    }

    pub fn detach(&self, listener_id: u64) {
        self.broker.detach(listener_id)
    }
}
