// ─── Downloader ───
// The transport seam the sync engine and the updater download through.

mod client;

use std::path::Path;

use async_trait::async_trait;

use crate::core::error::SyncResult;

pub use client::{part_path, HttpDownloader};

/// Progress of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
}

impl DownloadProgress {
    pub fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        Self {
            bytes_downloaded,
            total_bytes,
        }
    }

    /// Percentage in `0.0..=100.0`, when the size is known.
    pub fn percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(100.0),
            Some(total) => Some((self.bytes_downloaded as f64 / total as f64 * 100.0).min(100.0)),
            None => None,
        }
    }
}

pub type ProgressFn<'a> = dyn Fn(DownloadProgress) + Send + Sync + 'a;

/// Fetches `url` into `destination`.
///
/// Implementations must only leave a file at `destination` on success;
/// partial data goes to a temporary path that is renamed on completion.
#[async_trait]
pub trait FileDownloader: Send + Sync {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        on_progress: &ProgressFn<'_>,
    ) -> SyncResult<()>;
}
