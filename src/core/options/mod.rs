// ─── Minecraft Options ───
// Reads and writes the instance's `options.txt` (`key:value` per line).

mod resource_pack;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::fs;
use tracing::debug;

use crate::core::error::{SyncError, SyncResult};

pub use resource_pack::ResourcePack;

/// Options written by the game that packsync knows how to manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKey {
    ResourcePacks,
    IncompatibleResourcePacks,
    Lang,
}

impl OptionKey {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::ResourcePacks => "resourcePacks",
            OptionKey::IncompatibleResourcePacks => "incompatibleResourcePacks",
            OptionKey::Lang => "lang",
        }
    }
}

/// Options store shared inside the process. Writes are serialized by the lock,
/// which may be held across the store's async file operations.
pub type SharedOptionsStore = Arc<tokio::sync::Mutex<OptionsStore>>;

/// In-memory view of an options file with explicit load/persist cycles.
///
/// Every mutation rewrites the whole file.
#[derive(Debug)]
pub struct OptionsStore {
    path: PathBuf,
    properties: IndexMap<String, String>,
}

impl OptionsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn into_shared(self) -> SharedOptionsStore {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// Replace the in-memory map with the file contents.
    ///
    /// The file must exist and every non-blank line must contain a `:`.
    /// On error the previous in-memory state is kept.
    pub async fn load(&mut self) -> SyncResult<()> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::InvalidConfig(format!(
                    "The options file {:?} doesn't exist",
                    self.path
                )));
            }
            Err(e) => return Err(SyncError::io(&self.path, e)),
        };
        let mut properties = IndexMap::new();
        for (index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) =
                line.split_once(':')
                    .ok_or_else(|| SyncError::MalformedOptionsLine {
                        path: self.path.clone(),
                        line: index + 1,
                        content: line.to_string(),
                    })?;
            properties.insert(key.trim().to_string(), value.trim().to_string());
        }

        debug!("Loaded {} options from {:?}", properties.len(), self.path);
        self.properties = properties;
        Ok(())
    }

    pub fn get(&self, key: &str) -> SyncResult<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| SyncError::OptionNotFound {
                key: key.to_string(),
                path: self.path.clone(),
            })
    }

    /// Update one key and persist the whole map.
    pub async fn set(&mut self, key: &str, value: impl Into<String>) -> SyncResult<()> {
        self.properties.insert(key.to_string(), value.into());
        self.persist().await
    }

    /// Read a JSON-array valued option. `None` when the key is absent.
    pub fn get_list(&self, key: &str) -> SyncResult<Option<Vec<String>>> {
        let Some(raw) = self.properties.get(key) else {
            return Ok(None);
        };
        let values: Vec<String> = serde_json::from_str(raw).map_err(|e| {
            SyncError::InvalidConfig(format!(
                "Option {key} in {:?} is not a JSON list: {e}",
                self.path
            ))
        })?;
        Ok(Some(values))
    }

    pub async fn set_list(&mut self, key: &str, values: &[String]) -> SyncResult<()> {
        let encoded = serde_json::to_string(values)?;
        self.set(key, encoded).await
    }

    pub fn resource_packs(&self) -> SyncResult<Option<Vec<ResourcePack>>> {
        self.packs(OptionKey::ResourcePacks)
    }

    pub async fn set_resource_packs(&mut self, packs: &[ResourcePack]) -> SyncResult<()> {
        self.set_packs(OptionKey::ResourcePacks, packs).await
    }

    pub fn incompatible_resource_packs(&self) -> SyncResult<Option<Vec<ResourcePack>>> {
        self.packs(OptionKey::IncompatibleResourcePacks)
    }

    pub async fn set_incompatible_resource_packs(
        &mut self,
        packs: &[ResourcePack],
    ) -> SyncResult<()> {
        self.set_packs(OptionKey::IncompatibleResourcePacks, packs).await
    }

    /// Empty the map and truncate the backing file.
    pub async fn clear(&mut self) -> SyncResult<()> {
        self.properties.clear();
        fs::File::create(&self.path)
            .await
            .map_err(|e| SyncError::io(&self.path, e))?;
        Ok(())
    }

    fn packs(&self, key: OptionKey) -> SyncResult<Option<Vec<ResourcePack>>> {
        Ok(self
            .get_list(key.as_str())?
            .map(|values| values.iter().map(|v| ResourcePack::from_value(v)).collect()))
    }

    async fn set_packs(&mut self, key: OptionKey, packs: &[ResourcePack]) -> SyncResult<()> {
        let values: Vec<String> = packs.iter().map(ResourcePack::to_value).collect();
        self.set_list(key.as_str(), &values).await
    }

    /// Write every entry in insertion order through a sibling temp file.
    async fn persist(&self) -> SyncResult<()> {
        let mut contents = String::new();
        for (key, value) in &self.properties {
            contents.push_str(key);
            contents.push(':');
            contents.push_str(value);
            contents.push('\n');
        }

        let tmp = self.path.with_extension("txt.tmp");
        fs::write(&tmp, contents)
            .await
            .map_err(|e| SyncError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| SyncError::io(&self.path, e))?;
        Ok(())
    }
}
