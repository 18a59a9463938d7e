//! Seams to the host platform: the network-fetch primitive and the
//! deferred-retry trigger. Production code uses [`HttpFetcher`]; tests plug
//! in scripted doubles.

use crate::error::{DriftError, Result};
use crate::types::RetryTag;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Outcome of a network fetch. Cached responses are surfaced through the
/// same shape so strategy routing stays uniform.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// A synthetic 200 built from a cache entry.
    pub fn cached(body: Vec<u8>) -> Self {
        FetchResponse { status: 200, body }
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| DriftError::Json(e.to_string()))
    }
}

/// Issues an HTTP-like request and reports success or failure. A transport
/// error is `Err`; a response with a non-2xx status is `Ok` and left to the
/// caller to interpret.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// Registers a tag with the host so it will invoke the sync coordinator
/// again once connectivity or resources permit.
#[async_trait]
pub trait RetryScheduler: Send + Sync {
    async fn register(&self, tag: RetryTag) -> Result<()>;
}

/// Production fetcher on reqwest with a bounded per-request timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        HttpFetcher { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DriftError::Fetch(format!("Failed to reach {}: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| DriftError::Fetch(format!("Failed to read body from {}: {}", url, e)))?
            .to_vec();

        Ok(FetchResponse { status, body })
    }
}
