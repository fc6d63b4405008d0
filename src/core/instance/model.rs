use std::path::{Path, PathBuf};

/// Folder inside the game directory that holds packsync's own files.
pub const DATA_DIR_NAME: &str = "packsync";

/// On-disk layout of the game directory being synced (the `.minecraft`
/// equivalent the game runs from).
///
/// - `mods/`                       - mod JARs, reconciled against the manifest
/// - `options.txt`                 - game settings
/// - `packsync/config.json`        - [`crate::core::config::ScriptConfig`]
/// - `packsync/installed.json`     - mod files installed by previous syncs
/// - `packsync/temp/`              - scratch space (staged downloads, updates)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInstance {
    root: PathBuf,
}

impl GameInstance {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the `mods/` directory.
    pub fn mods_dir(&self) -> PathBuf {
        self.root.join("mods")
    }

    /// Path to the game's `options.txt`.
    pub fn options_path(&self) -> PathBuf {
        self.root.join("options.txt")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir().join("config.json")
    }

    /// Record of the mod files earlier syncs put into `mods/`.
    pub fn installed_index_path(&self) -> PathBuf {
        self.data_dir().join("installed.json")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.data_dir().join("temp")
    }

    /// Where mod downloads are staged until they pass verification.
    pub fn downloads_dir(&self) -> PathBuf {
        self.temp_dir().join("downloads")
    }
}
