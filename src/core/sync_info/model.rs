use serde::{Deserialize, Serialize};

use crate::core::error::{SyncError, SyncResult};
use crate::core::integrity::{IntegrityInfo, VerificationStrength};

/// Which side of the game this run syncs. Client-only content (shaders,
/// resource packs, client mods) is never installed on a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Client,
    Server,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Client => write!(f, "client"),
            Environment::Server => write!(f, "server"),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Client
    }
}

/// Per-environment requirement of a mod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    Required,
    Optional,
    Unsupported,
}

impl Default for SupportLevel {
    fn default() -> Self {
        SupportLevel::Required
    }
}

/// One mod as declared by the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModDescriptor {
    pub download_url: String,
    #[serde(default)]
    pub file_integrity_info: IntegrityInfo,
    /// Display name; the URL file name is used when absent.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub client_support: SupportLevel,
    #[serde(default)]
    pub server_support: SupportLevel,
    #[serde(default)]
    pub description: Option<String>,
    /// Overrides both the mods-wide and the global integrity flags.
    #[serde(default)]
    pub override_verify_integrity: Option<bool>,
    /// Overrides [`SyncInfo::sync_optional_mods`] for this mod when it is
    /// optional on the current environment.
    #[serde(default)]
    pub sync_optional: Option<bool>,
}

impl ModDescriptor {
    pub fn new(download_url: impl Into<String>) -> Self {
        Self {
            download_url: download_url.into(),
            file_integrity_info: IntegrityInfo::default(),
            name: None,
            client_support: SupportLevel::Required,
            server_support: SupportLevel::Required,
            description: None,
            override_verify_integrity: None,
            sync_optional: None,
        }
    }

    /// File name the mod is stored under, taken from the last URL segment.
    pub fn file_name(&self) -> SyncResult<String> {
        file_name_from_url(&self.download_url)
    }

    /// Name shown in logs and reports.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        self.file_name()
            .unwrap_or_else(|_| self.download_url.clone())
    }

    /// Support level for the given environment.
    pub fn support_for(&self, environment: Environment) -> SupportLevel {
        match environment {
            Environment::Client => self.client_support,
            Environment::Server => self.server_support,
        }
    }

    /// Mod override, then the mods-wide flag, then the global asset flag.
    pub fn should_verify_integrity(&self, sync_info: &SyncInfo) -> bool {
        self.override_verify_integrity
            .or(sync_info.verify_mod_integrity)
            .unwrap_or(sync_info.verify_asset_integrity)
    }
}

/// Derive a file name from a download URL.
pub fn file_name_from_url(url: &str) -> SyncResult<String> {
    let parsed =
        reqwest::Url::parse(url).map_err(|e| SyncError::InvalidModUrl(format!("{url}: {e}")))?;

    let name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| SyncError::InvalidModUrl(format!("{url}: no file name in path")))?;

    if name == "." || name == ".." {
        return Err(SyncError::InvalidModUrl(format!(
            "{url}: invalid file name {name:?}"
        )));
    }

    Ok(name.to_string())
}

/// A server entry shipped with the manifest so players don't have to update
/// addresses by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEntry {
    pub name: String,
    pub address: String,
}

fn default_true() -> bool {
    true
}

fn default_strength() -> Option<VerificationStrength> {
    Some(VerificationStrength::Medium)
}

/// Remote-declared sync manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInfo {
    /// Global integrity switch. When off only file names are compared.
    #[serde(default = "default_true")]
    pub verify_asset_integrity: bool,
    /// Integrity switch for the mods category; falls back to the global one.
    #[serde(default)]
    pub verify_mod_integrity: Option<bool>,
    /// `null` verifies every available digest.
    #[serde(default = "default_strength")]
    pub preferred_verification_strength: Option<VerificationStrength>,
    /// Whether optional mods are installed unless a mod says otherwise.
    #[serde(default = "default_true")]
    pub sync_optional_mods: bool,
    #[serde(default)]
    pub mods: Vec<ModDescriptor>,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl Default for SyncInfo {
    fn default() -> Self {
        Self {
            verify_asset_integrity: true,
            verify_mod_integrity: None,
            preferred_verification_strength: default_strength(),
            sync_optional_mods: true,
            mods: Vec::new(),
            servers: Vec::new(),
        }
    }
}
