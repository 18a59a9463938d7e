//! Durable queue store: one append-only JSONL op log per partition,
//! replayed on open to rebuild the live entry set. Every enqueue or remove
//! is a single flushed line, so a crash can tear at most the trailing
//! record, which replay discards.

use crate::error::{DriftError, Result};
use crate::types::{Partition, QueueEntry};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Current durable-layout version. Opening at a higher version than the one
/// recorded on disk creates any missing partition logs and never destroys
/// existing ones.
pub const SCHEMA_VERSION: u32 = 2;

/// Dead records tolerated in a log before it is rewritten to live entries.
const COMPACT_AFTER_DEAD: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
enum LogRecord {
    Enqueue { id: u64, url: String },
    Remove { id: u64 },
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    schema_version: u32,
    partitions: Vec<String>,
}

struct LogInner {
    writer: BufWriter<File>,
    live: Vec<QueueEntry>,
    dead: usize,
}

struct PartitionLog {
    partition: Partition,
    path: PathBuf,
    next_id: AtomicU64,
    inner: Mutex<LogInner>,
}

impl PartitionLog {
    fn open(dir: &Path, partition: Partition) -> Result<Self> {
        let path = dir.join(format!("{}.jsonl", partition.log_name()));
        let (live, dead, max_id) = Self::replay(&path)?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(PartitionLog {
            partition,
            path,
            next_id: AtomicU64::new(max_id),
            inner: Mutex::new(LogInner {
                writer: BufWriter::new(file),
                live,
                dead,
            }),
        })
    }

    /// Rebuild the live ordered set from the log. Unparseable lines (torn
    /// trailing writes) are skipped; a remove for an unknown id is ignored.
    fn replay(path: &Path) -> Result<(Vec<QueueEntry>, usize, u64)> {
        let mut live: Vec<QueueEntry> = Vec::new();
        let mut dead = 0usize;
        let mut max_id = 0u64;

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((live, dead, max_id));
            }
            Err(e) => return Err(e.into()),
        };

        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogRecord>(&line) {
                Ok(LogRecord::Enqueue { id, url }) => {
                    if id > max_id {
                        max_id = id;
                    }
                    live.push(QueueEntry { id, url });
                }
                Ok(LogRecord::Remove { id }) => {
                    if let Some(pos) = live.iter().position(|e| e.id == id) {
                        live.remove(pos);
                        dead += 1;
                    }
                }
                Err(_) => {
                    tracing::warn!("Skipping torn record in {}", path.display());
                }
            }
        }

        Ok((live, dead, max_id))
    }

    fn append_locked(&self, inner: &mut LogInner, record: &LogRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        inner.writer.write_all(line.as_bytes())?;
        inner.writer.write_all(b"\n")?;
        inner.writer.flush()?;
        Ok(())
    }

    fn enqueue(&self, url: &str) -> Result<u64> {
        // Id draw happens under the lock so commit order and id order agree.
        let mut inner = self.inner.lock().unwrap();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.append_locked(
            &mut inner,
            &LogRecord::Enqueue {
                id,
                url: url.to_string(),
            },
        )?;
        inner.live.push(QueueEntry {
            id,
            url: url.to_string(),
        });
        Ok(id)
    }

    fn remove(&self, id: u64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let pos = inner
            .live
            .iter()
            .position(|e| e.id == id)
            .ok_or(DriftError::EntryNotFound {
                partition: self.partition,
                id,
            })?;
        self.append_locked(&mut inner, &LogRecord::Remove { id })?;
        inner.live.remove(pos);
        inner.dead += 1;

        if inner.dead >= COMPACT_AFTER_DEAD {
            self.compact_locked(&mut inner)?;
        }
        Ok(())
    }

    fn list(&self) -> Vec<QueueEntry> {
        self.inner.lock().unwrap().live.clone()
    }

    fn len(&self) -> usize {
        self.inner.lock().unwrap().live.len()
    }

    /// Rewrite the log to only live entries via temp file + rename.
    fn compact_locked(&self, inner: &mut LogInner) -> Result<()> {
        inner.writer.flush()?;

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let tmp = File::create(&tmp_path)?;
            let mut w = BufWriter::new(tmp);
            for entry in &inner.live {
                let line = serde_json::to_string(&LogRecord::Enqueue {
                    id: entry.id,
                    url: entry.url.clone(),
                })?;
                w.write_all(line.as_bytes())?;
                w.write_all(b"\n")?;
            }
            w.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        inner.writer = BufWriter::new(file);
        inner.dead = 0;
        Ok(())
    }
}

/// Typed CRUD over the two durable partitions. Safe to share across tasks;
/// each partition log serializes its own access.
pub struct QueueStore {
    dir: PathBuf,
    outbound: PartitionLog,
    pending: PartitionLog,
}

impl QueueStore {
    /// Open (or create) the store at the current schema version.
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_at(dir, SCHEMA_VERSION)
    }

    /// Versioned, idempotent open. A higher version than previously seen
    /// creates missing partition logs; entries in existing logs survive.
    pub fn open_at(dir: &Path, schema_version: u32) -> Result<Self> {
        fs::create_dir_all(dir)
            .map_err(|e| DriftError::StorageUnavailable(format!("{}: {}", dir.display(), e)))?;

        let meta_path = dir.join("meta.json");
        let recorded_meta = fs::read_to_string(&meta_path)
            .ok()
            .and_then(|content| serde_json::from_str::<StoreMeta>(&content).ok());
        let recorded = recorded_meta.as_ref().map(|m| m.schema_version).unwrap_or(0);

        // Logs recorded by an earlier layout but unknown to this one are
        // retained on disk, never replayed or deleted.
        if let Some(meta) = &recorded_meta {
            for name in &meta.partitions {
                if !Partition::ALL.iter().any(|p| p.log_name() == name.as_str()) {
                    tracing::warn!(
                        "Retaining log for unrecognized partition {:?} recorded at schema {}",
                        name,
                        meta.schema_version
                    );
                }
            }
        }

        let outbound = PartitionLog::open(dir, Partition::OutboundPosts)
            .map_err(|e| DriftError::StorageUnavailable(e.to_string()))?;
        let pending = PartitionLog::open(dir, Partition::PendingReads)
            .map_err(|e| DriftError::StorageUnavailable(e.to_string()))?;

        if schema_version > recorded {
            let meta = StoreMeta {
                schema_version,
                partitions: Partition::ALL.iter().map(|p| p.to_string()).collect(),
            };
            fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)
                .map_err(|e| DriftError::StorageUnavailable(e.to_string()))?;
            tracing::info!(
                "Store at {} migrated to schema {}",
                dir.display(),
                schema_version
            );
        }

        Ok(QueueStore {
            dir: dir.to_path_buf(),
            outbound,
            pending,
        })
    }

    fn log(&self, partition: Partition) -> &PartitionLog {
        match partition {
            Partition::OutboundPosts => &self.outbound,
            Partition::PendingReads => &self.pending,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Commit one entry and return its store-assigned id. Ids are monotonic
    /// per partition and never reused, even across reopens.
    pub fn enqueue(&self, partition: Partition, url: &str) -> Result<u64> {
        let id = self.log(partition).enqueue(url)?;
        tracing::debug!("Enqueued entry {} into {}: {}", id, partition, url);
        Ok(id)
    }

    /// All live entries in insertion order.
    pub fn list_all(&self, partition: Partition) -> Result<Vec<QueueEntry>> {
        Ok(self.log(partition).list())
    }

    pub fn remove(&self, partition: Partition, id: u64) -> Result<()> {
        self.log(partition).remove(id)?;
        tracing::debug!("Removed entry {} from {}", id, partition);
        Ok(())
    }

    pub fn len(&self, partition: Partition) -> usize {
        self.log(partition).len()
    }

    pub fn is_empty(&self, partition: Partition) -> bool {
        self.len(partition) == 0
    }

    /// Live URLs in insertion order, for the waiting-posts reply.
    pub fn urls(&self, partition: Partition) -> Result<Vec<String>> {
        Ok(self
            .log(partition)
            .list()
            .into_iter()
            .map(|e| e.url)
            .collect())
    }
}
