#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use packsync_lib::core::downloader::{DownloadProgress, FileDownloader, ProgressFn};
use packsync_lib::core::error::{SyncError, SyncResult};
use packsync_lib::core::instance::GameInstance;
use packsync_lib::core::integrity::{hash_str, HashAlgorithm, IntegrityInfo};
use packsync_lib::core::sync_info::ModDescriptor;
use tempfile::TempDir;

pub const CDN: &str = "https://cdn.example.com/mods";

/// What the fake server answers for a URL.
#[derive(Clone)]
pub enum Served {
    Body(String),
    Status(u16),
    /// Never completes.
    Hang,
}

/// In-memory downloader: serves canned bodies and records every request.
#[derive(Default)]
pub struct MockDownloader {
    responses: HashMap<String, Served>,
    requested: Mutex<Vec<String>>,
    /// How long each transfer takes.
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: impl Into<String>, served: Served) -> Self {
        self.responses.insert(url.into(), served);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Most transfers that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl FileDownloader for MockDownloader {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        on_progress: &ProgressFn<'_>,
    ) -> SyncResult<()> {
        self.requested.lock().unwrap().push(url.to_string());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let result = self.respond(url, destination, on_progress).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl MockDownloader {
    async fn respond(
        &self,
        url: &str,
        destination: &Path,
        on_progress: &ProgressFn<'_>,
    ) -> SyncResult<()> {
        match self.responses.get(url).cloned() {
            Some(Served::Body(body)) => {
                on_progress(DownloadProgress::new(
                    body.len() as u64,
                    Some(body.len() as u64),
                ));
                tokio::fs::write(destination, body)
                    .await
                    .map_err(|e| SyncError::io(destination, e))
            }
            Some(Served::Status(status)) => Err(SyncError::DownloadFailed {
                url: url.to_string(),
                status,
            }),
            Some(Served::Hang) => std::future::pending().await,
            None => Err(SyncError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

pub fn mod_url(file_name: &str) -> String {
    format!("{CDN}/{file_name}")
}

/// Descriptor whose sha256 matches `content`.
pub fn mod_with_content(file_name: &str, content: &str) -> ModDescriptor {
    let mut descriptor = ModDescriptor::new(mod_url(file_name));
    descriptor.file_integrity_info =
        IntegrityInfo::default().with(HashAlgorithm::Sha256, hash_str(content, HashAlgorithm::Sha256));
    descriptor
}

/// Temporary instance with an existing `mods/` folder.
pub fn instance() -> (TempDir, GameInstance) {
    let dir = tempfile::tempdir().unwrap();
    let instance = GameInstance::new(dir.path());
    std::fs::create_dir_all(instance.mods_dir()).unwrap();
    (dir, instance)
}

pub fn write_mod(instance: &GameInstance, file_name: &str, content: &str) {
    std::fs::write(instance.mods_dir().join(file_name), content).unwrap();
}

pub fn read_mod(instance: &GameInstance, file_name: &str) -> Option<String> {
    std::fs::read_to_string(instance.mods_dir().join(file_name)).ok()
}

pub fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}
