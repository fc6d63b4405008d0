use std::path::Path;

use tracing::info;

use super::model::GameInstance;
use crate::core::error::{SyncError, SyncResult};

impl GameInstance {
    /// Check the game directory exists, then make sure the folders packsync
    /// writes to are present.
    ///
    /// Creates (if missing):
    /// - `<root>/mods/`
    /// - `<root>/packsync/temp/downloads/`
    pub async fn prepare(&self) -> SyncResult<()> {
        let metadata = tokio::fs::metadata(self.root())
            .await
            .map_err(|source| SyncError::Io {
                path: self.root().to_path_buf(),
                source,
            })?;
        if !metadata.is_dir() {
            return Err(SyncError::InvalidConfig(format!(
                "Invalid instance: {:?} is not a directory",
                self.root()
            )));
        }

        let mods_dir = self.mods_dir();
        let downloads_dir = self.downloads_dir();
        tokio::try_join!(create_dir_safe(&mods_dir), create_dir_safe(&downloads_dir))?;

        self.verify_structure().await?;
        info!("Instance ready at {:?}", self.root());
        Ok(())
    }

    pub async fn verify_structure(&self) -> SyncResult<()> {
        for path in [self.mods_dir(), self.downloads_dir()] {
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|source| SyncError::Io {
                    path: path.clone(),
                    source,
                })?;
            if !metadata.is_dir() {
                return Err(SyncError::InvalidConfig(format!(
                    "Invalid instance structure: {:?} is not a directory",
                    path
                )));
            }
        }

        Ok(())
    }

    /// Remove leftovers from staged downloads. Missing directory is fine.
    pub async fn clear_downloads(&self) -> SyncResult<()> {
        let dir = self.downloads_dir();
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::io(dir, e)),
        }
        create_dir_safe(&dir).await
    }
}

async fn create_dir_safe(path: &Path) -> SyncResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        })
}
