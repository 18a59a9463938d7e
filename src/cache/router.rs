//! Applies one of four caching policies to a static-resource request based
//! on an exact-match URL table. URLs absent from the table pass straight
//! through to the network, uncached. Data-request URLs are never routed
//! here; the queue owns those.

use crate::cache::response_cache::ResponseCache;
use crate::error::{DriftError, Result};
use crate::platform::{FetchResponse, Fetcher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Serve from cache, never touch the network.
    CacheOnly,
    /// Always fetch fresh, never read or write the cache.
    NetworkOnly,
    /// Cache hit wins; otherwise fetch (result not implicitly cached).
    CacheFailNetwork,
    /// Fetch; on network failure fall back to cache.
    NetworkFailCache,
}

impl Strategy {
    /// Whether install-time prefetch should populate the cache for this
    /// strategy.
    pub fn cache_backed(&self) -> bool {
        !matches!(self, Strategy::NetworkOnly)
    }
}

/// One row of the static policy table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRule {
    pub url: String,
    pub strategy: Strategy,
}

pub struct StrategyRouter {
    rules: Vec<AssetRule>,
    cache: Arc<ResponseCache>,
    fetcher: Arc<dyn Fetcher>,
}

impl StrategyRouter {
    pub fn new(
        rules: Vec<AssetRule>,
        cache: Arc<ResponseCache>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        StrategyRouter {
            rules,
            cache,
            fetcher,
        }
    }

    pub fn strategy_for(&self, url: &str) -> Option<Strategy> {
        self.rules.iter().find(|r| r.url == url).map(|r| r.strategy)
    }

    pub async fn route(&self, url: &str) -> Result<FetchResponse> {
        match self.strategy_for(url) {
            Some(Strategy::CacheOnly) => match self.cache.lookup(url)? {
                Some(body) => Ok(FetchResponse::cached(body)),
                None => Err(DriftError::CacheMiss(url.to_string())),
            },
            Some(Strategy::NetworkOnly) | None => self.fetcher.fetch(url).await,
            Some(Strategy::CacheFailNetwork) => match self.cache.lookup(url)? {
                Some(body) => Ok(FetchResponse::cached(body)),
                None => self.fetcher.fetch(url).await,
            },
            Some(Strategy::NetworkFailCache) => match self.fetcher.fetch(url).await {
                Ok(response) => Ok(response),
                Err(network_err) => match self.cache.lookup(url)? {
                    Some(body) => {
                        tracing::debug!(
                            "Network failed for {} ({}), served from cache",
                            url,
                            network_err
                        );
                        Ok(FetchResponse::cached(body))
                    }
                    None => Err(DriftError::Unavailable(url.to_string())),
                },
            },
        }
    }
}
