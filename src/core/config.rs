// ─── Script Config & Sync Context ───
// Per-instance settings and the explicit context object handed to the
// components of one run.

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::error::{SyncError, SyncResult};
use crate::core::http::build_http_client;
use crate::core::instance::GameInstance;
use crate::core::options::{OptionsStore, SharedOptionsStore};
use crate::core::sync_info::{Environment, SyncInfo};

pub const DEFAULT_CONCURRENCY: usize = 6;

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Settings stored at `<instance>/packsync/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfig {
    /// `http(s)://` URL or local path of the sync info manifest.
    pub sync_info_url: String,
    #[serde(default)]
    pub environment: Environment,
    /// Maximum number of mods downloaded at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub auto_update: bool,
    /// Mod files the user added by hand; never removed by a sync.
    #[serde(default)]
    pub protected_files: Vec<String>,
    /// Document holding `project = "<version>"`.
    #[serde(default)]
    pub version_marker_url: Option<String>,
    /// Where the latest executable is published.
    #[serde(default)]
    pub update_artifact_url: Option<String>,
}

impl ScriptConfig {
    pub fn new(sync_info_url: impl Into<String>) -> Self {
        Self {
            sync_info_url: sync_info_url.into(),
            environment: Environment::Client,
            concurrency: DEFAULT_CONCURRENCY,
            auto_update: false,
            protected_files: Vec::new(),
            version_marker_url: None,
            update_artifact_url: None,
        }
    }

    /// Load the config of `instance`. Missing or malformed files are fatal.
    pub async fn load(instance: &GameInstance) -> SyncResult<Self> {
        let path = instance.config_path();
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SyncError::InvalidConfig(format!("Cannot read script config {:?}: {}", path, e))
        })?;
        let config: ScriptConfig = serde_json::from_str(&raw).map_err(|e| {
            SyncError::InvalidConfig(format!("Malformed script config {:?}: {}", path, e))
        })?;
        if config.sync_info_url.trim().is_empty() {
            return Err(SyncError::InvalidConfig(format!(
                "syncInfoUrl is empty in {:?}",
                path
            )));
        }
        Ok(config)
    }

    pub async fn save(&self, instance: &GameInstance) -> SyncResult<()> {
        let path = instance.config_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| SyncError::io(&path, e))
    }

    /// Concurrency clamped to at least one transfer.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn protected_set(&self) -> HashSet<String> {
        self.protected_files.iter().cloned().collect()
    }
}

/// Everything one sync run needs, built once and passed around explicitly.
#[derive(Clone)]
pub struct SyncContext {
    pub config: Arc<ScriptConfig>,
    pub sync_info: Arc<SyncInfo>,
    pub instance: GameInstance,
    /// The instance's `options.txt`, loaded on demand. Clones of the context
    /// share one store so launcher integrations see each other's writes.
    pub options: SharedOptionsStore,
    pub http_client: Client,
}

impl SyncContext {
    pub fn new(
        config: ScriptConfig,
        sync_info: SyncInfo,
        instance: GameInstance,
        http_client: Client,
    ) -> Self {
        let options = OptionsStore::new(instance.options_path()).into_shared();
        Self {
            config: Arc::new(config),
            sync_info: Arc::new(sync_info),
            instance,
            options,
            http_client,
        }
    }

    /// Like [`SyncContext::new`] with a freshly built client.
    pub fn with_default_client(
        config: ScriptConfig,
        sync_info: SyncInfo,
        instance: GameInstance,
    ) -> SyncResult<Self> {
        Ok(Self::new(config, sync_info, instance, build_http_client()?))
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[tokio::test]
    async fn load_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let instance = GameInstance::new(dir.path());
        std::fs::create_dir_all(instance.data_dir()).unwrap();
        std::fs::write(
            instance.config_path(),
            r#"{ "syncInfoUrl": "https://example.com/sync-info.json" }"#,
        )
        .unwrap();

        let config = ScriptConfig::load(&instance).await.unwrap();
        assert_eq!(config.environment, Environment::Client);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert!(!config.auto_update);
        assert!(config.protected_files.is_empty());
    }

    #[tokio::test]
    async fn missing_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScriptConfig::load(&GameInstance::new(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let instance = GameInstance::new(dir.path());
        let mut config = ScriptConfig::new("sync-info.json");
        config.environment = Environment::Server;
        config.protected_files.push("my-own-mod.jar".into());

        config.save(&instance).await.unwrap();
        assert_eq!(ScriptConfig::load(&instance).await.unwrap(), config);
    }

    #[test]
    fn context_points_options_at_instance() {
        let instance = GameInstance::new("/games/survival");
        let mut config = ScriptConfig::new("sync-info.json");
        config.environment = Environment::Server;

        let ctx = SyncContext::with_default_client(config, SyncInfo::default(), instance.clone())
            .unwrap();
        assert_eq!(ctx.environment(), Environment::Server);
        let options = ctx.options.try_lock().unwrap();
        assert_eq!(options.path(), instance.options_path().as_path());
    }

    #[tokio::test]
    async fn context_clones_share_options() {
        let dir = tempfile::tempdir().unwrap();
        let instance = GameInstance::new(dir.path());
        std::fs::write(instance.options_path(), "lang:en_us\n").unwrap();
        let ctx = SyncContext::with_default_client(
            ScriptConfig::new("sync-info.json"),
            SyncInfo::default(),
            instance.clone(),
        )
        .unwrap();
        let other = ctx.clone();

        {
            let mut options = ctx.options.lock().await;
            options.load().await.unwrap();
            options.set("lang", "fr_fr").await.unwrap();
        }

        assert_eq!(other.options.lock().await.get("lang").unwrap(), "fr_fr");
        assert_eq!(
            std::fs::read_to_string(instance.options_path()).unwrap(),
            "lang:fr_fr\n"
        );
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let mut config = ScriptConfig::new("x");
        config.concurrency = 0;
        assert_eq!(config.effective_concurrency(), 1);
    }
}
