use std::path::PathBuf;
use thiserror::Error;

use crate::core::integrity::HashAlgorithm;

/// Central error type for the sync backend.
/// Every module returns `Result<T, SyncError>`.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("{algorithm} mismatch for {path:?}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: PathBuf,
        algorithm: HashAlgorithm,
        expected: String,
        actual: String,
    },

    #[error("Integrity of {path:?} could not be determined: {reason}")]
    IntegrityIndeterminate { path: PathBuf, reason: String },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Configuration ───────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid mod download URL: {0}")]
    InvalidModUrl(String),

    #[error("Malformed line {line} in {path:?}: {content:?}")]
    MalformedOptionsLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("Option {key} doesn't exist in {path:?}")]
    OptionNotFound { key: String, path: PathBuf },

    // ── Versions ────────────────────────────────────────
    #[error("Invalid version: {0}")]
    Version(#[from] semver::Error),

    // ── Platform ────────────────────────────────────────
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // ── Control flow ────────────────────────────────────
    #[error("Operation cancelled")]
    Cancelled,

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type SyncResult<T> = Result<T, SyncError>;

/// Coarse classification used when reporting per-mod failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed manifest, options file or script config. Fatal for a run.
    Config,
    /// Hash mismatch. Only the affected file is discarded.
    Integrity,
    /// Disk or network failure, recoverable per item.
    Io,
    /// Self-update on a platform we don't know how to swap binaries on.
    UnsupportedPlatform,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Integrity => write!(f, "integrity"),
            ErrorKind::Io => write!(f, "io"),
            ErrorKind::UnsupportedPlatform => write!(f, "unsupported-platform"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Io { .. }
            | SyncError::Http(_)
            | SyncError::DownloadFailed { .. }
            | SyncError::IntegrityIndeterminate { .. }
            | SyncError::Other(_) => ErrorKind::Io,
            SyncError::IntegrityMismatch { .. } => ErrorKind::Integrity,
            SyncError::Json(_)
            | SyncError::InvalidConfig(_)
            | SyncError::InvalidModUrl(_)
            | SyncError::MalformedOptionsLine { .. }
            | SyncError::OptionNotFound { .. }
            | SyncError::Version(_) => ErrorKind::Config,
            SyncError::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
            SyncError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Shorthand for wrapping an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(source: std::io::Error) -> Self {
        SyncError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
