// ─── Mod Sync Engine ───
// Resolves, diffs, downloads, verifies and applies the manifest's mods.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::plan::{
    list_local_mods, read_installed_index, write_installed_index, LocalModFile, PlannedMod,
    SyncPlan,
};
use super::report::{ModFailure, SyncReport};
use crate::core::config::{SyncContext, DEFAULT_CONCURRENCY};
use crate::core::downloader::{DownloadProgress, FileDownloader};
use crate::core::environment::EnvironmentResolver;
use crate::core::error::{SyncError, SyncResult};
use crate::core::instance::GameInstance;
use crate::core::integrity::{IntegrityVerifier, Verification};
use crate::core::sync_info::{Environment, SyncInfo};

/// Where a sync run currently is. `Failed` can follow any other phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Init,
    Resolving,
    Diffing,
    Downloading,
    /// Every download finished; remaining pipelines are verifying/moving.
    Verifying,
    Applying,
    Done,
    Failed,
}

/// Result of one mod's download → verify → move pipeline.
enum PipelineOutcome {
    Added(String),
    Failed(ModFailure),
    Cancelled(String),
}

/// Reconciles an instance's `mods/` folder with a [`SyncInfo`].
pub struct ModSyncEngine {
    sync_info: Arc<SyncInfo>,
    instance: GameInstance,
    environment: Environment,
    downloader: Arc<dyn FileDownloader>,
    /// Maximum number of concurrent pipelines.
    concurrency: usize,
    protected_files: HashSet<String>,
    cancel: CancellationToken,
    phase: watch::Sender<SyncPhase>,
}

impl ModSyncEngine {
    pub fn new(
        sync_info: Arc<SyncInfo>,
        instance: GameInstance,
        downloader: Arc<dyn FileDownloader>,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Init);
        Self {
            sync_info,
            instance,
            environment: Environment::Client,
            downloader,
            concurrency: DEFAULT_CONCURRENCY,
            protected_files: HashSet::new(),
            cancel: CancellationToken::new(),
            phase,
        }
    }

    /// Build an engine from the run's context.
    pub fn from_context(ctx: &SyncContext, downloader: Arc<dyn FileDownloader>) -> Self {
        Self::new(ctx.sync_info.clone(), ctx.instance.clone(), downloader)
            .with_environment(ctx.environment())
            .with_concurrency(ctx.config.effective_concurrency())
            .with_protected_files(ctx.config.protected_set())
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_protected_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.protected_files.extend(files);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that aborts the run: no new downloads start once it fires.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Observe phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    fn enter(&self, phase: SyncPhase) {
        debug!("Sync phase: {:?}", phase);
        self.phase.send_replace(phase);
    }

    // ── Resolving + Diffing ─────────────────────────────

    /// Compute what the run would do without touching any mod file.
    pub async fn plan(&self) -> SyncResult<SyncPlan> {
        let result = self.build_plan().await;
        if result.is_err() {
            self.enter(SyncPhase::Failed);
        }
        result
    }

    async fn build_plan(&self) -> SyncResult<SyncPlan> {
        self.enter(SyncPhase::Resolving);
        let resolution = EnvironmentResolver::resolve(
            &self.sync_info.mods,
            self.environment,
            self.sync_info.sync_optional_mods,
        );

        let mut plan = SyncPlan::default();
        for descriptor in &resolution.excluded {
            info!(
                "⏭ Skipping {} (not needed on {})",
                descriptor.display_name(),
                self.environment
            );
            plan.skipped.push(descriptor.display_name());
        }

        let mut desired: Vec<PlannedMod> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for descriptor in resolution.included {
            match descriptor.file_name() {
                Ok(file_name) => {
                    if !seen.insert(file_name.clone()) {
                        warn!(
                            "Duplicate mod file {} in sync info, keeping the first entry",
                            file_name
                        );
                        continue;
                    }
                    desired.push(PlannedMod {
                        descriptor: descriptor.clone(),
                        file_name,
                    });
                }
                Err(e) => {
                    warn!("Cannot sync {}: {}", descriptor.display_name(), e);
                    plan.invalid.push(ModFailure::new(
                        descriptor.display_name(),
                        &descriptor.download_url,
                        &e,
                    ));
                }
            }
        }

        self.enter(SyncPhase::Diffing);
        let mods_dir = self.instance.mods_dir();
        tokio::fs::create_dir_all(&mods_dir)
            .await
            .map_err(|e| SyncError::io(&mods_dir, e))?;
        plan.installed = read_installed_index(&self.instance.installed_index_path()).await;
        let tracked: BTreeSet<String> = desired
            .iter()
            .map(|m| m.file_name.clone())
            .chain(plan.installed.iter().cloned())
            .collect();
        let local = list_local_mods(&mods_dir, &tracked).await?;

        let checks: Vec<(PlannedMod, bool)> = stream::iter(desired)
            .map(|planned| {
                let local_path = local.get(&planned.file_name).cloned();
                async move {
                    let keep = match local_path {
                        Some(path) => self.existing_file_is_valid(&planned, &path).await,
                        None => false,
                    };
                    (planned, keep)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        for (planned, keep) in checks {
            if keep {
                plan.to_keep.push(planned);
            } else {
                plan.to_download.push(planned);
            }
        }

        // Lowercased: on case-insensitive filesystems `Sodium.jar` and
        // `sodium.jar` are the same file, and deleting one deletes the other.
        let wanted: HashSet<String> = plan
            .to_keep
            .iter()
            .chain(plan.to_download.iter())
            .map(|m| m.file_name.to_lowercase())
            .collect();
        for (file_name, path) in local {
            if wanted.contains(&file_name.to_lowercase()) {
                continue;
            }
            if self.protected_files.contains(&file_name) {
                debug!("Keeping protected file {}", file_name);
                continue;
            }
            plan.to_remove.push(LocalModFile { file_name, path });
        }

        info!(
            "Sync plan: {} to download, {} to keep, {} to remove, {} skipped",
            plan.to_download.len(),
            plan.to_keep.len(),
            plan.to_remove.len(),
            plan.skipped.len()
        );
        Ok(plan)
    }

    async fn existing_file_is_valid(&self, planned: &PlannedMod, path: &Path) -> bool {
        if !planned.descriptor.should_verify_integrity(&self.sync_info) {
            debug!(
                "Integrity check disabled for {}, matching by file name",
                planned.file_name
            );
            return true;
        }

        let verification = IntegrityVerifier::verify(
            path,
            &planned.descriptor.file_integrity_info,
            self.sync_info.preferred_verification_strength,
        )
        .await;

        match &verification {
            Verification::Match(_) | Verification::NameOnly => true,
            Verification::Mismatch { algorithm, .. } => {
                warn!(
                    "Local {} fails {} check, downloading it again",
                    planned.file_name, algorithm
                );
                false
            }
            Verification::Indeterminate(reason) => {
                warn!(
                    "Cannot verify local {} ({}), downloading it again",
                    planned.file_name, reason
                );
                false
            }
        }
    }

    // ── Full run ────────────────────────────────────────

    /// Run the full reconciliation.
    ///
    /// Per-mod failures end up in the report. An `Err` means the mods
    /// directory itself could not be prepared or listed.
    pub async fn run(&self) -> SyncResult<SyncReport> {
        let started_at = Utc::now();
        info!(
            "Syncing {} mods for {} into {:?}",
            self.sync_info.mods.len(),
            self.environment,
            self.instance.mods_dir()
        );

        let plan = self.plan().await?;

        if let Err(e) = self.instance.clear_downloads().await {
            error!("Cannot prepare download staging area: {}", e);
            self.enter(SyncPhase::Failed);
            return Err(e);
        }

        let mut report = SyncReport::new(started_at);
        report.skipped = plan.skipped;
        report.failed.extend(plan.invalid);
        report.kept = plan.to_keep.iter().map(PlannedMod::display_name).collect();

        let mut tracked: BTreeSet<String> = plan.installed;
        tracked.extend(
            plan.to_keep
                .iter()
                .chain(plan.to_download.iter())
                .map(|m| m.file_name.clone()),
        );

        self.enter(SyncPhase::Downloading);
        for outcome in self.download_all(plan.to_download).await {
            match outcome {
                PipelineOutcome::Added(name) => report.added.push(name),
                PipelineOutcome::Failed(failure) => {
                    warn!("❌ {}", failure);
                    report.failed.push(failure);
                }
                PipelineOutcome::Cancelled(name) => report.cancelled.push(name),
            }
        }

        if self.cancel.is_cancelled() {
            info!(
                "Sync cancelled, leaving {} unwanted files in place",
                plan.to_remove.len()
            );
        } else {
            self.enter(SyncPhase::Applying);
            self.remove_unwanted(plan.to_remove, &mut report).await;
        }

        self.record_installed(tracked).await;

        if let Err(e) = self.instance.clear_downloads().await {
            warn!("Cannot clean download staging area: {}", e);
        }

        report.finished_at = Utc::now();
        self.enter(SyncPhase::Done);
        info!("✅ Sync finished: {}", report);
        Ok(report)
    }

    async fn download_all(&self, to_download: Vec<PlannedMod>) -> Vec<PipelineOutcome> {
        if to_download.is_empty() {
            return Vec::new();
        }

        info!(
            "Downloading {} mods, concurrency={}",
            to_download.len(),
            self.concurrency
        );
        let pending = Arc::new(AtomicUsize::new(to_download.len()));

        stream::iter(to_download)
            .map(|planned| {
                let pending = pending.clone();
                async move { self.sync_one(planned, &pending).await }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    fn download_finished(&self, pending: &AtomicUsize) {
        if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.enter(SyncPhase::Verifying);
        }
    }

    /// Download → verify → move for a single mod.
    async fn sync_one(&self, planned: PlannedMod, pending: &AtomicUsize) -> PipelineOutcome {
        let name = planned.display_name();
        if self.cancel.is_cancelled() {
            self.download_finished(pending);
            return PipelineOutcome::Cancelled(name);
        }

        let url = planned.descriptor.download_url.as_str();
        let staged = self.staging_path(&planned.file_name);
        info!("🔽 Downloading {} from {}", name, url);

        let on_progress = |progress: DownloadProgress| {
            trace!(
                "{}: {} bytes ({:?}%)",
                planned.file_name,
                progress.bytes_downloaded,
                progress.percent()
            );
        };

        let downloaded = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            result = self.downloader.download(url, &staged, &on_progress) => result,
        };
        self.download_finished(pending);

        if let Err(e) = downloaded {
            discard(&staged).await;
            if matches!(e, SyncError::Cancelled) {
                return PipelineOutcome::Cancelled(name);
            }
            return PipelineOutcome::Failed(ModFailure::new(name, url, &e));
        }

        if planned.descriptor.should_verify_integrity(&self.sync_info) {
            let verification = IntegrityVerifier::verify(
                &staged,
                &planned.descriptor.file_integrity_info,
                self.sync_info.preferred_verification_strength,
            )
            .await;
            if let Err(e) = verification.into_result(&staged) {
                discard(&staged).await;
                return PipelineOutcome::Failed(ModFailure::new(name, url, &e));
            }
        }

        let target = self.instance.mods_dir().join(&planned.file_name);
        if let Err(e) = tokio::fs::rename(&staged, &target).await {
            discard(&staged).await;
            let e = SyncError::io(&target, e);
            return PipelineOutcome::Failed(ModFailure::new(
                name,
                target.display().to_string(),
                &e,
            ));
        }

        info!("✔ Installed {}", name);
        PipelineOutcome::Added(name)
    }

    /// Remember which of `candidates` are in the mods folder now, so the next
    /// run can remove them once the manifest drops them.
    async fn record_installed(&self, candidates: BTreeSet<String>) {
        let mods_dir = self.instance.mods_dir();
        let mut present = BTreeSet::new();
        for file_name in candidates {
            let is_file = tokio::fs::metadata(mods_dir.join(&file_name))
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if is_file {
                present.insert(file_name);
            }
        }

        let path = self.instance.installed_index_path();
        if let Err(e) = write_installed_index(&path, present).await {
            warn!("Cannot update installed mods index: {}", e);
        }
    }

    fn staging_path(&self, file_name: &str) -> PathBuf {
        self.instance
            .downloads_dir()
            .join(format!("{}-{}", Uuid::new_v4().simple(), file_name))
    }

    // ── Applying ────────────────────────────────────────

    async fn remove_unwanted(&self, to_remove: Vec<LocalModFile>, report: &mut SyncReport) {
        for file in to_remove {
            match tokio::fs::remove_file(&file.path).await {
                Ok(()) => {
                    info!("🗑 Removed {}", file.file_name);
                    report.removed.push(file.file_name);
                }
                Err(e) => {
                    let e = SyncError::io(&file.path, e);
                    warn!("Cannot remove {}: {}", file.file_name, e);
                    report.failed.push(ModFailure::new(
                        file.file_name,
                        file.path.display().to_string(),
                        &e,
                    ));
                }
            }
        }
    }
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Cannot delete {:?}: {}", path, e),
    }
}
