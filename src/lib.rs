//! # Driftsync
//!
//! Offline-tolerant synchronization core for a browser-hosted news feed
//! widget. The widget itself is thin DOM glue; this crate is the part that
//! has to be correct when connectivity is not: it routes static-resource
//! requests through per-URL cache strategies, durably queues data requests
//! that cannot complete, replays them when the host fires a deferred-retry
//! signal, and broadcasts outcomes to attached foreground listeners.
//!
//! The host platform is abstracted behind two seams: a [`platform::Fetcher`]
//! (network primitive, [`platform::HttpFetcher`] in production) and a
//! [`platform::RetryScheduler`] (deferred-retry registration).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use driftsync::{SyncWorker, WorkerConfig};
//! use driftsync::types::{ClientCommand, RetryTag};
//! use std::sync::Arc;
//!
//! # async fn run(scheduler: Arc<dyn driftsync::platform::RetryScheduler>) -> driftsync::Result<()> {
//! let config = WorkerConfig::load_or_default(std::path::Path::new("./data"));
//! let worker = SyncWorker::open_with_http(config, scheduler)?;
//!
//! worker.on_install().await?;
//! worker.on_activate()?;
//!
//! let (listener, mut _events) = worker.attach();
//! worker
//!     .on_message(
//!         listener,
//!         ClientCommand::SendPost { url: "https://store/x?title=Hi".into() },
//!     )
//!     .await?;
//!
//! // Later, when the host signals connectivity:
//! worker.on_sync(RetryTag::SendPosts).await?;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod cache;
pub mod config;
pub mod error;
pub mod platform;
pub mod store;
pub mod sync;
pub mod types;
pub mod worker;

pub use broker::{CommandOutcome, MessageBroker};
pub use cache::{CacheLifecycle, ResponseCache, Strategy, StrategyRouter};
pub use config::WorkerConfig;
pub use error::{DriftError, Result};
pub use platform::{FetchResponse, Fetcher, HttpFetcher, RetryScheduler};
pub use store::QueueStore;
pub use sync::{DrainReport, SyncCoordinator};
pub use types::{ClientCommand, ClientEvent, Partition, Post, QueueEntry, RetryTag};
pub use worker::{global_or_open, global_worker, SyncWorker};

/// Initialize tracing from `RUST_LOG` (or the given default filter).
/// Call once at startup if the embedding host has no subscriber of its own.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
