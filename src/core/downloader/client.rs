use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{DownloadProgress, FileDownloader, ProgressFn};
use crate::core::error::{SyncError, SyncResult};
use crate::core::http::build_http_client;

/// Streams HTTP bodies to disk through a `.part` file.
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_default_client() -> SyncResult<Self> {
        Ok(Self::new(build_http_client()?))
    }

    async fn stream_to(
        &self,
        url: &str,
        part: &Path,
        on_progress: &ProgressFn<'_>,
    ) -> SyncResult<()> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let mut stream = response.bytes_stream();

        // Write inside a block so the handle is closed before the rename;
        // Windows refuses to rename open files.
        {
            let mut file = tokio::fs::File::create(part)
                .await
                .map_err(|e| SyncError::io(part, e))?;

            let mut bytes_downloaded = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| SyncError::io(part, e))?;
                bytes_downloaded += chunk.len() as u64;
                on_progress(DownloadProgress::new(bytes_downloaded, total_bytes));
            }

            file.flush().await.map_err(|e| SyncError::io(part, e))?;
        }

        Ok(())
    }
}

#[async_trait]
impl FileDownloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        on_progress: &ProgressFn<'_>,
    ) -> SyncResult<()> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }

        let part = part_path(destination);
        if let Err(e) = self.stream_to(url, &part, on_progress).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }

        tokio::fs::rename(&part, destination)
            .await
            .map_err(|e| SyncError::io(destination, e))?;

        debug!("Downloaded: {} -> {:?}", url, destination);
        Ok(())
    }
}

/// `<destination>.part`, next to the destination so the final rename stays
/// on one filesystem.
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
