//! Versioned cache lifecycle. Install populates the current generation
//! from the policy table; activate evicts every other generation sharing
//! our prefix, so exactly one generation is live after each deploy.

use crate::cache::response_cache::{self, ResponseCache};
use crate::cache::router::AssetRule;
use crate::error::Result;
use crate::platform::Fetcher;
use std::path::PathBuf;
use std::sync::Arc;

pub struct CacheLifecycle {
    root: PathBuf,
    prefix: String,
    rules: Vec<AssetRule>,
    cache: Arc<ResponseCache>,
    fetcher: Arc<dyn Fetcher>,
}

impl CacheLifecycle {
    pub fn new(
        root: PathBuf,
        prefix: String,
        rules: Vec<AssetRule>,
        cache: Arc<ResponseCache>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        CacheLifecycle {
            root,
            prefix,
            rules,
            cache,
            fetcher,
        }
    }

    /// Prefetch every cache-backed URL into the current generation.
    /// Individual failures are logged and skipped; a later fetch through
    /// the router still has its fallback path.
    pub async fn install(&self) -> Result<usize> {
        let mut stored = 0usize;
        for rule in &self.rules {
            if !rule.strategy.cache_backed() {
                continue;
            }
            match self.fetcher.fetch(&rule.url).await {
                Ok(response) if response.ok() => {
                    self.cache.put(&rule.url, &response.body)?;
                    stored += 1;
                }
                Ok(response) => {
                    tracing::warn!(
                        "Prefetch of {} returned status {}, skipped",
                        rule.url,
                        response.status
                    );
                }
                Err(e) => {
                    tracing::warn!("Prefetch of {} failed: {}", rule.url, e);
                }
            }
        }
        tracing::info!(
            "Installed cache generation {} ({} of {} assets stored)",
            self.cache.generation(),
            stored,
            self.rules.iter().filter(|r| r.strategy.cache_backed()).count()
        );
        Ok(stored)
    }

    /// Delete every generation that shares our prefix but is not the
    /// current one. Generations under other prefixes are left alone.
    pub fn activate(&self) -> Result<usize> {
        let mut evicted = 0usize;
        for name in response_cache::list_generations(&self.root, &self.prefix)? {
            if name != self.cache.generation() {
                response_cache::delete_generation(&self.root, &name)?;
                tracing::info!("Evicted stale cache generation {}", name);
                evicted += 1;
            }
        }
        Ok(evicted)
    }
}
