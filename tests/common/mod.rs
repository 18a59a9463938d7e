//! Shared test doubles: a switchable scripted fetcher and a recording
//! retry scheduler, wired into a worker over a temp directory.

use async_trait::async_trait;
use driftsync::platform::{FetchResponse, Fetcher, RetryScheduler};
use driftsync::types::RetryTag;
use driftsync::{Result, SyncWorker, WorkerConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub struct ScriptedFetcher {
    online: AtomicBool,
    calls: AtomicUsize,
    bodies: Mutex<HashMap<String, Vec<u8>>>,
}

#[allow(dead_code)]
impl ScriptedFetcher {
    pub fn new(online: bool) -> Arc<Self> {
        Arc::new(ScriptedFetcher {
            online: AtomicBool::new(online),
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn set_body(&self, url: &str, body: &[u8]) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_vec());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(driftsync::DriftError::Fetch(format!("offline: {}", url)));
        }
        let body = self
            .bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.as_bytes().to_vec());
        Ok(FetchResponse { status: 200, body })
    }
}

pub struct RecordingScheduler {
    tags: Mutex<Vec<RetryTag>>,
}

#[allow(dead_code)]
impl RecordingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingScheduler {
            tags: Mutex::new(Vec::new()),
        })
    }

    pub fn registered(&self) -> Vec<RetryTag> {
        self.tags.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetryScheduler for RecordingScheduler {
    async fn register(&self, tag: RetryTag) -> Result<()> {
        self.tags.lock().unwrap().push(tag);
        Ok(())
    }
}

#[allow(dead_code)]
pub struct Rig {
    pub dir: TempDir,
    pub fetcher: Arc<ScriptedFetcher>,
    pub scheduler: Arc<RecordingScheduler>,
    pub worker: Arc<SyncWorker>,
}

#[allow(dead_code)]
pub fn rig(online: bool) -> Rig {
    let dir = TempDir::new().unwrap();
    let fetcher = ScriptedFetcher::new(online);
    let scheduler = RecordingScheduler::new();
    let config = WorkerConfig::load_or_default(dir.path());
    let worker = SyncWorker::open(config, fetcher.clone(), scheduler.clone()).unwrap();
    Rig {
        dir,
        fetcher,
        scheduler,
        worker,
    }
}
