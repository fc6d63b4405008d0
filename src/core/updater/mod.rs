// ─── Self Updater ───
// Checks the published version, downloads a newer executable and stages the
// swap. Every failure here is non-fatal: the caller just keeps running the
// current build.

mod swap;
mod version;

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use tracing::{info, warn};

use crate::core::downloader::{DownloadProgress, FileDownloader};
use crate::core::error::{SyncError, SyncResult};

pub use swap::{windows_update_script, OperatingSystem, PendingSwap};
pub use version::{compare_versions, extract_project_version, UpdateDecision, CURRENT_VERSION};

const EXECUTABLE_STEM: &str = "packsync";

/// What an update attempt ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    Unsupported,
    Failed(String),
    /// The new build is downloaded; commit the swap and exit.
    Staged(PendingSwap),
}

pub struct SelfUpdater {
    client: Client,
    downloader: Arc<dyn FileDownloader>,
    version_marker_url: String,
    artifact_url: String,
    /// Where the new executable is downloaded to.
    work_dir: PathBuf,
    current_version: String,
    current_executable: Option<PathBuf>,
    os: OperatingSystem,
}

impl SelfUpdater {
    pub fn new(
        client: Client,
        downloader: Arc<dyn FileDownloader>,
        version_marker_url: impl Into<String>,
        artifact_url: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            downloader,
            version_marker_url: version_marker_url.into(),
            artifact_url: artifact_url.into(),
            work_dir: work_dir.into(),
            current_version: CURRENT_VERSION.to_string(),
            current_executable: None,
            os: OperatingSystem::current(),
        }
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Defaults to `std::env::current_exe()`.
    pub fn with_current_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.current_executable = Some(path.into());
        self
    }

    pub fn with_os(mut self, os: OperatingSystem) -> Self {
        self.os = os;
        self
    }

    /// Fetch the version marker and extract the published version.
    pub async fn latest_version(&self) -> SyncResult<String> {
        info!("📥 Checking latest version at {}", self.version_marker_url);
        let response = self.client.get(&self.version_marker_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::DownloadFailed {
                url: self.version_marker_url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;

        extract_project_version(&body).ok_or_else(|| {
            SyncError::Other(format!(
                "No project version found in {}, consider updating manually",
                self.version_marker_url
            ))
        })
    }

    pub async fn check(&self) -> SyncResult<UpdateDecision> {
        let latest = self.latest_version().await?;
        compare_versions(&self.current_version, &latest)
    }

    /// Check, download and stage an update. Never fails the caller.
    pub async fn update_if_available(&self) -> UpdateOutcome {
        if !self.os.is_supported() {
            warn!("⚠ Auto update is not supported on {}", self.os);
            return UpdateOutcome::Unsupported;
        }

        let current_executable = match self.current_executable.clone() {
            Some(path) => path,
            None => match std::env::current_exe() {
                Ok(path) => path,
                Err(e) => {
                    warn!("Cannot locate the running executable: {}", e);
                    return UpdateOutcome::Failed(e.to_string());
                }
            },
        };

        let decision = match self.check().await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("❌ Couldn't check for updates: {}", e);
                return UpdateOutcome::Failed(e.to_string());
            }
        };

        let latest = match decision {
            UpdateDecision::UpToDate => {
                info!("✨ Running the latest version ({})", self.current_version);
                return UpdateOutcome::UpToDate;
            }
            UpdateDecision::NewerThanLatest => {
                info!(
                    "✨ Running {} which is newer than the latest release",
                    self.current_version
                );
                return UpdateOutcome::UpToDate;
            }
            UpdateDecision::UpdateAvailable(latest) => latest,
        };

        info!(
            "Updating from {} to {}, downloading {}",
            self.current_version, latest, self.artifact_url
        );
        let new_executable = self
            .work_dir
            .join(self.os.new_executable_name(EXECUTABLE_STEM));

        if let Err(e) = self.download_artifact(&new_executable).await {
            warn!("❌ Couldn't download the update: {}", e);
            return UpdateOutcome::Failed(e.to_string());
        }

        info!("The update has been downloaded, it is applied on exit");
        UpdateOutcome::Staged(PendingSwap {
            current_executable,
            new_executable,
            work_dir: self.work_dir.clone(),
            os: self.os,
        })
    }

    async fn download_artifact(&self, destination: &std::path::Path) -> SyncResult<()> {
        match tokio::fs::remove_file(destination).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::io(destination, e)),
        }

        let on_progress = |progress: DownloadProgress| {
            tracing::trace!(
                "update: {} bytes ({:?}%)",
                progress.bytes_downloaded,
                progress.percent()
            );
        };
        self.downloader
            .download(&self.artifact_url, destination, &on_progress)
            .await
    }
}
