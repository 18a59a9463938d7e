//! Local response cache, one directory per generation, entries
//! content-addressed by the SHA-256 of the request URL.

use crate::error::{DriftError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub struct ResponseCache {
    dir: PathBuf,
    generation: String,
}

impl ResponseCache {
    /// Open (or create) the cache directory for `generation` under `root`.
    pub fn open(root: &Path, generation: &str) -> Result<Self> {
        let dir = root.join(generation);
        fs::create_dir_all(&dir)
            .map_err(|e| DriftError::StorageUnavailable(format!("{}: {}", dir.display(), e)))?;
        Ok(ResponseCache {
            dir,
            generation: generation.to_string(),
        })
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(hex::encode(digest))
    }

    /// Store a response body for `url`, replacing any previous entry.
    /// Written via temp file + rename so readers never see a partial body.
    pub fn put(&self, url: &str, body: &[u8]) -> Result<()> {
        let path = self.entry_path(url);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn lookup(&self, url: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.entry_path(url)) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entry_path(url).exists()
    }
}

/// Names of all generations under `root` that start with `prefix`.
pub fn list_generations(root: &Path, prefix: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(prefix) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Delete one generation wholesale.
pub fn delete_generation(root: &Path, name: &str) -> Result<()> {
    fs::remove_dir_all(root.join(name))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_lookup() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::open(tmp.path(), "feed-v1").unwrap();

        assert_eq!(cache.lookup("https://a/app.js").unwrap(), None);
        cache.put("https://a/app.js", b"console.log(1)").unwrap();
        assert_eq!(
            cache.lookup("https://a/app.js").unwrap().as_deref(),
            Some(b"console.log(1)".as_ref())
        );
        assert!(cache.contains("https://a/app.js"));
        assert!(!cache.contains("https://a/style.css"));
    }

    #[test]
    fn test_put_replaces() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::open(tmp.path(), "feed-v1").unwrap();

        cache.put("https://a/app.js", b"old").unwrap();
        cache.put("https://a/app.js", b"new").unwrap();
        assert_eq!(
            cache.lookup("https://a/app.js").unwrap().as_deref(),
            Some(b"new".as_ref())
        );
    }

    #[test]
    fn test_generation_listing_respects_prefix() {
        let tmp = TempDir::new().unwrap();
        ResponseCache::open(tmp.path(), "feed-v1").unwrap();
        ResponseCache::open(tmp.path(), "feed-v2").unwrap();
        ResponseCache::open(tmp.path(), "unrelated-v9").unwrap();

        let names = list_generations(tmp.path(), "feed-").unwrap();
        assert_eq!(names, vec!["feed-v1", "feed-v2"]);

        delete_generation(tmp.path(), "feed-v1").unwrap();
        let names = list_generations(tmp.path(), "feed-").unwrap();
        assert_eq!(names, vec!["feed-v2"]);
    }
}
