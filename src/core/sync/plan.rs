use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{SyncError, SyncResult};
use crate::core::sync_info::ModDescriptor;

use super::report::ModFailure;

/// File extension of mod files the sync manages.
pub const MOD_FILE_EXTENSION: &str = "jar";

/// A desired mod paired with the file name it lives under.
#[derive(Debug, Clone)]
pub struct PlannedMod {
    pub descriptor: ModDescriptor,
    pub file_name: String,
}

impl PlannedMod {
    pub fn display_name(&self) -> String {
        self.descriptor
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.file_name.clone())
    }
}

/// A local mod file not wanted by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalModFile {
    pub file_name: String,
    pub path: PathBuf,
}

/// Decisions computed by diffing the manifest against the mods directory.
#[derive(Debug, Default)]
pub struct SyncPlan {
    /// Missing locally, or present but failing verification.
    pub to_download: Vec<PlannedMod>,
    /// Present and valid, or present with verification disabled.
    pub to_keep: Vec<PlannedMod>,
    pub to_remove: Vec<LocalModFile>,
    /// Display names of mods not applicable to the environment.
    pub skipped: Vec<String>,
    /// Mods that could not even be planned (e.g. URL without a file name).
    pub invalid: Vec<ModFailure>,
    /// Files recorded as installed by earlier runs.
    pub installed: BTreeSet<String>,
}

impl SyncPlan {
    pub fn download_names(&self) -> Vec<&str> {
        self.to_download.iter().map(|m| m.file_name.as_str()).collect()
    }

    pub fn keep_names(&self) -> Vec<&str> {
        self.to_keep.iter().map(|m| m.file_name.as_str()).collect()
    }

    pub fn remove_names(&self) -> Vec<&str> {
        self.to_remove.iter().map(|m| m.file_name.as_str()).collect()
    }
}

/// Mod files currently in `mods_dir`, keyed by file name.
///
/// Regular files with a `.jar` extension always count. Other regular files
/// count only when their name is in `tracked` (wanted by the manifest or
/// installed by an earlier sync). Folders are never listed.
pub async fn list_local_mods(
    mods_dir: &Path,
    tracked: &BTreeSet<String>,
) -> SyncResult<BTreeMap<String, PathBuf>> {
    let mut mods = BTreeMap::new();

    let mut entries = tokio::fs::read_dir(mods_dir)
        .await
        .map_err(|e| SyncError::io(mods_dir, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SyncError::io(mods_dir, e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| SyncError::io(&path, e))?;
        if !file_type.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_jar = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(MOD_FILE_EXTENSION))
            .unwrap_or(false);
        if is_jar || tracked.contains(name) {
            mods.insert(name.to_string(), path.clone());
        }
    }

    Ok(mods)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct InstalledIndex {
    files: BTreeSet<String>,
}

/// File names an earlier sync left in the mods folder.
///
/// A missing or unreadable index is treated as empty.
pub async fn read_installed_index(path: &Path) -> BTreeSet<String> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeSet::new(),
        Err(e) => {
            warn!("Cannot read installed mods index {:?}: {}", path, e);
            return BTreeSet::new();
        }
    };
    match serde_json::from_str::<InstalledIndex>(&raw) {
        Ok(index) => index.files,
        Err(e) => {
            warn!("Ignoring malformed installed mods index {:?}: {}", path, e);
            BTreeSet::new()
        }
    }
}

pub async fn write_installed_index(path: &Path, files: BTreeSet<String>) -> SyncResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SyncError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(&InstalledIndex { files })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| SyncError::io(path, e))
}
