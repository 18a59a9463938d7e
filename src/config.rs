use crate::cache::router::{AssetRule, Strategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_fetch_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Directory holding the durable queue logs and store metadata.
    pub data_dir: PathBuf,
    /// Directory holding cache generations.
    pub cache_root: PathBuf,
    /// Generation naming prefix; activate only evicts generations under it.
    pub cache_prefix: String,
    /// Current generation name, e.g. "news-feed-v1". Changing it supersedes
    /// the previous generation wholesale.
    pub cache_name: String,
    /// Static-asset policy table (exact URL match).
    pub assets: Vec<AssetRule>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl WorkerConfig {
    /// Load configuration from {base_dir}/worker.json or fall back to
    /// defaults with `DRIFTSYNC_*` environment overrides.
    pub fn load_or_default(base_dir: &Path) -> Self {
        let worker_json = base_dir.join("worker.json");

        if worker_json.exists() {
            match std::fs::read_to_string(&worker_json) {
                Ok(content) => match serde_json::from_str::<WorkerConfig>(&content) {
                    Ok(config) => {
                        tracing::info!(
                            "Loaded worker config: cache_name={}, assets={}",
                            config.cache_name,
                            config.assets.len()
                        );
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse worker.json: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to read worker.json: {}, using defaults", e);
                }
            }
        }

        let cache_name = std::env::var("DRIFTSYNC_CACHE_NAME")
            .unwrap_or_else(|_| "news-feed-v1".to_string());
        let cache_prefix = std::env::var("DRIFTSYNC_CACHE_PREFIX")
            .unwrap_or_else(|_| "news-feed-".to_string());

        WorkerConfig {
            data_dir: base_dir.join("queue"),
            cache_root: base_dir.join("cache"),
            cache_prefix,
            cache_name,
            assets: Self::default_assets(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }

    /// The widget's own script and stylesheet, served cache-first.
    pub fn default_assets() -> Vec<AssetRule> {
        vec![
            AssetRule {
                url: "https://news-feed.example/news_feed.js".to_string(),
                strategy: Strategy::CacheFailNetwork,
            },
            AssetRule {
                url: "https://news-feed.example/style.css".to_string(),
                strategy: Strategy::CacheFailNetwork,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_or_default_no_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = WorkerConfig::load_or_default(temp_dir.path());

        assert_eq!(config.assets.len(), 2);
        assert!(config.cache_name.starts_with(&config.cache_prefix));
        assert_eq!(config.data_dir, temp_dir.path().join("queue"));
    }

    #[test]
    fn test_load_or_default_valid_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let worker_json_path = temp_dir.path().join("worker.json");

        let config_str = r#"{
            "data_dir": "/var/lib/feed/queue",
            "cache_root": "/var/lib/feed/cache",
            "cache_prefix": "feed-",
            "cache_name": "feed-v3",
            "assets": [
                {"url": "https://a/app.js", "strategy": "cacheFailNetwork"},
                {"url": "https://a/live.json", "strategy": "networkOnly"}
            ]
        }"#;

        let mut file = std::fs::File::create(&worker_json_path).unwrap();
        file.write_all(config_str.as_bytes()).unwrap();

        let config = WorkerConfig::load_or_default(temp_dir.path());

        assert_eq!(config.cache_name, "feed-v3");
        assert_eq!(config.assets.len(), 2);
        assert_eq!(config.assets[1].strategy, Strategy::NetworkOnly);
        assert_eq!(config.fetch_timeout_secs, 5);
    }

    #[test]
    fn test_load_or_default_invalid_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let worker_json_path = temp_dir.path().join("worker.json");

        let mut file = std::fs::File::create(&worker_json_path).unwrap();
        file.write_all(b"invalid json").unwrap();

        let config = WorkerConfig::load_or_default(temp_dir.path());

        // Falls back to defaults.
        assert_eq!(config.assets.len(), 2);
    }
}
