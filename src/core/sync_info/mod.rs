// ─── Sync Info ───
// The manifest describing which mods an instance should have, and how to
// fetch it from a URL or a local file.

mod model;

use std::path::Path;

use tracing::info;

use crate::core::error::{SyncError, SyncResult};

pub use crate::core::integrity::{IntegrityInfo, VerificationStrength};
pub use model::{
    file_name_from_url, Environment, ModDescriptor, ServerEntry, SupportLevel, SyncInfo,
};

impl SyncInfo {
    /// Parse a manifest from JSON text.
    pub fn from_json(raw: &str) -> SyncResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| SyncError::InvalidConfig(format!("Malformed sync info: {e}")))
    }

    /// Fetch the manifest over HTTP using a shared client.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> SyncResult<Self> {
        info!("Fetching sync info from {}", url);

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let raw = response.text().await?;
        let sync_info = Self::from_json(&raw)?;
        info!("Loaded {} mods from sync info", sync_info.mods.len());
        Ok(sync_info)
    }

    /// Read the manifest from a local file.
    pub async fn read_from(path: &Path) -> SyncResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::io(path, e))?;
        Self::from_json(&raw)
    }

    /// Load from `source`, which is either an `http(s)://` URL or a file path.
    pub async fn load(client: &reqwest::Client, source: &str) -> SyncResult<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::fetch(client, source).await
        } else {
            Self::read_from(Path::new(source)).await
        }
    }
}
