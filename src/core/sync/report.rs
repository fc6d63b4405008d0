use chrono::{DateTime, Utc};

use crate::core::error::{ErrorKind, SyncError};

/// Why one mod could not be brought in line with the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModFailure {
    pub mod_name: String,
    /// The URL or path the failed operation was working on.
    pub target: String,
    pub kind: ErrorKind,
    pub reason: String,
}

impl ModFailure {
    pub fn new(mod_name: impl Into<String>, target: impl Into<String>, error: &SyncError) -> Self {
        Self {
            mod_name: mod_name.into(),
            target: target.into(),
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

impl std::fmt::Display for ModFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] ({}): {}",
            self.mod_name, self.kind, self.target, self.reason
        )
    }
}

/// Result of one reconciliation run.
///
/// A report is produced whenever the mods directory stayed consistent, even
/// if individual mods failed; callers decide whether failures are fatal.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub kept: Vec<String>,
    pub removed: Vec<String>,
    /// Not applicable to the current environment. Expected, not an error.
    pub skipped: Vec<String>,
    pub failed: Vec<ModFailure>,
    /// Never started or interrupted because the run was cancelled.
    pub cancelled: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub(crate) fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            added: Vec::new(),
            kept: Vec::new(),
            removed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            cancelled: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }

    /// True when nothing failed and nothing was cancelled.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }

    pub fn was_cancelled(&self) -> bool {
        !self.cancelled.is_empty()
    }

    pub fn failure_for(&self, mod_name: &str) -> Option<&ModFailure> {
        self.failed.iter().find(|f| f.mod_name == mod_name)
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} added, {} kept, {} removed, {} skipped, {} failed",
            self.added.len(),
            self.kept.len(),
            self.removed.len(),
            self.skipped.len(),
            self.failed.len()
        )?;
        if !self.cancelled.is_empty() {
            write!(f, ", {} cancelled", self.cancelled.len())?;
        }
        let elapsed = self.finished_at - self.started_at;
        write!(f, " in {}ms", elapsed.num_milliseconds())
    }
}
