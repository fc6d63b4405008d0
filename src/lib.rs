pub mod core;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::config::{ScriptConfig, SyncContext};
use crate::core::downloader::{FileDownloader, HttpDownloader};
use crate::core::error::SyncResult;
use crate::core::http::build_http_client;
use crate::core::instance::GameInstance;
use crate::core::sync::{ModSyncEngine, SyncReport};
use crate::core::sync_info::SyncInfo;
use crate::core::updater::{PendingSwap, SelfUpdater, UpdateOutcome};

/// Sync the instance given as first argument (or the current directory).
pub fn run() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,packsync_lib=debug")),
        )
        .init();

    info!("Packsync {} starting...", env!("CARGO_PKG_VERSION"));

    let instance_dir = match std::env::args_os().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                error!("Cannot determine the instance directory: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Cannot start the async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        match build_http_client() {
            Ok(client) => sync_instance(GameInstance::new(instance_dir), client).await,
            Err(e) => InstanceRun {
                pending_update: None,
                report: Err(e),
            },
        }
    });
    drop(runtime);

    // Last act before exiting: the swap may replace this very binary.
    if let Some(swap) = outcome.pending_update {
        if let Err(e) = swap.commit() {
            warn!("❌ Couldn't apply the update: {}", e);
        }
    }

    match outcome.report {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Sync aborted ({}): {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

/// What [`sync_instance`] produced.
#[derive(Debug)]
pub struct InstanceRun {
    /// Downloaded update, to be committed whatever happened to the sync.
    pub pending_update: Option<PendingSwap>,
    pub report: SyncResult<SyncReport>,
}

/// Self-update (when configured) then sync the mods of `instance`. Leaves the
/// executable swap to the caller.
pub async fn sync_instance(instance: GameInstance, client: reqwest::Client) -> InstanceRun {
    let config = match load_config(&instance).await {
        Ok(config) => config,
        Err(e) => {
            return InstanceRun {
                pending_update: None,
                report: Err(e),
            }
        }
    };

    let downloader: Arc<dyn FileDownloader> = Arc::new(HttpDownloader::new(client.clone()));
    let pending_update = self_update(&config, &instance, &client, downloader.clone()).await;
    let report = sync_mods(config, instance, client, downloader).await;

    InstanceRun {
        pending_update,
        report,
    }
}

async fn load_config(instance: &GameInstance) -> SyncResult<ScriptConfig> {
    instance.prepare().await?;
    ScriptConfig::load(instance).await
}

async fn sync_mods(
    config: ScriptConfig,
    instance: GameInstance,
    client: reqwest::Client,
    downloader: Arc<dyn FileDownloader>,
) -> SyncResult<SyncReport> {
    let sync_info = SyncInfo::load(&client, &config.sync_info_url).await?;
    let ctx = SyncContext::new(config, sync_info, instance, client);
    let engine = ModSyncEngine::from_context(&ctx, downloader);

    let token = engine.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after in-flight downloads");
            token.cancel();
        }
    });

    let report = engine.run().await;
    ctrl_c.abort();
    let report = report?;

    for failure in &report.failed {
        warn!("Failed: {}", failure);
    }
    if report.is_clean() {
        info!("✅ Mods are up to date ({})", report);
    } else {
        warn!("⚠ Sync finished with problems: {}", report);
    }

    Ok(report)
}

/// Optional pre-sync update step. Problems are logged and otherwise ignored.
async fn self_update(
    config: &ScriptConfig,
    instance: &GameInstance,
    client: &reqwest::Client,
    downloader: Arc<dyn FileDownloader>,
) -> Option<PendingSwap> {
    if !config.auto_update {
        return None;
    }
    let (Some(marker_url), Some(artifact_url)) =
        (&config.version_marker_url, &config.update_artifact_url)
    else {
        warn!("autoUpdate is on but versionMarkerUrl or updateArtifactUrl is missing");
        return None;
    };

    let updater = SelfUpdater::new(
        client.clone(),
        downloader,
        marker_url.as_str(),
        artifact_url.as_str(),
        instance.temp_dir(),
    );
    match updater.update_if_available().await {
        UpdateOutcome::Staged(swap) => Some(swap),
        _ => None,
    }
}
