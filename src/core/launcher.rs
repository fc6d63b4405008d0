// ─── Launcher Adapters ───
// The contract launcher integrations implement. The core never reads a
// launcher's own files; it only goes through this trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::core::error::SyncResult;
use crate::core::sync_info::{ModDescriptor, SyncInfo};

#[async_trait]
pub trait LauncherAdapter: Send + Sync {
    /// Check `instance_dir` looks like an instance of this launcher.
    async fn validate_instance_directory(&self, instance_dir: &Path) -> SyncResult<()>;

    /// Mods installed in the instance, as manifest entries.
    async fn list_descriptors(&self, instance_dir: &Path) -> SyncResult<Vec<ModDescriptor>>;

    /// Set (or clear with `None`) the command the launcher runs before the game.
    async fn set_pre_launch_command(
        &self,
        instance_dir: &Path,
        command: Option<String>,
    ) -> SyncResult<()>;
}

/// Install or uninstall packsync as an instance's pre-launch step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationConfig {
    Install { executable_path: PathBuf },
    Uninstall,
}

impl InstallationConfig {
    /// The pre-launch command this configuration results in.
    pub fn pre_launch_command(&self) -> Option<String> {
        match self {
            InstallationConfig::Install { executable_path } => {
                Some(format!("\"{}\"", executable_path.display()))
            }
            InstallationConfig::Uninstall => None,
        }
    }
}

pub async fn apply_installation(
    adapter: &dyn LauncherAdapter,
    instance_dir: &Path,
    config: &InstallationConfig,
) -> SyncResult<()> {
    adapter.validate_instance_directory(instance_dir).await?;
    adapter
        .set_pre_launch_command(instance_dir, config.pre_launch_command())
        .await?;

    match config {
        InstallationConfig::Install { executable_path } => {
            info!("Installed {:?} as pre-launch command", executable_path)
        }
        InstallationConfig::Uninstall => info!("Removed pre-launch command"),
    }
    Ok(())
}

/// Build a manifest from the mods an instance already has, for publishing.
pub async fn manifest_from_launcher(
    adapter: &dyn LauncherAdapter,
    instance_dir: &Path,
) -> SyncResult<SyncInfo> {
    adapter.validate_instance_directory(instance_dir).await?;
    let mods = adapter.list_descriptors(instance_dir).await?;
    info!("Exported {} mods from {:?}", mods.len(), instance_dir);
    Ok(SyncInfo {
        mods,
        ..SyncInfo::default()
    })
}
