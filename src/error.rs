use crate::types::Partition;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DriftError {
    #[error("Durable store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("No entry {id} in partition {partition}")]
    EntryNotFound { partition: Partition, id: u64 },

    #[error("Cache miss for {0}")]
    CacheMiss(String),

    #[error("Resource unavailable (network and cache both failed): {0}")]
    Unavailable(String),

    #[error("Delivery failed for entry {id} ({url}): {reason}")]
    DeliveryFailed {
        id: u64,
        url: String,
        reason: String,
    },

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Retry registration failed: {0}")]
    SchedulerUnavailable(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DriftError>;

impl From<std::io::Error> for DriftError {
    fn from(e: std::io::Error) -> Self {
        DriftError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for DriftError {
    fn from(e: serde_json::Error) -> Self {
        DriftError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for DriftError {
    fn from(e: reqwest::Error) -> Self {
        DriftError::Fetch(e.to_string())
    }
}
