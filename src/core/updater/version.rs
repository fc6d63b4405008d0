use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::core::error::SyncResult;

/// `project = "<version>"`, not matching longer keys such as `subproject`.
static PROJECT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bproject\s*=\s*"(.+?)""#).expect("Invalid project version regex")
});

/// Version of the running build.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the version check concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    UpToDate,
    /// Running a build newer than the published one (e.g. a dev build).
    NewerThanLatest,
    UpdateAvailable(Version),
}

impl UpdateDecision {
    pub fn should_update(&self) -> bool {
        matches!(self, UpdateDecision::UpdateAvailable(_))
    }
}

/// Extract `<version>` from a `project = "<version>"` line anywhere in `text`.
pub fn extract_project_version(text: &str) -> Option<String> {
    PROJECT_VERSION
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Compare the running version against the latest published one.
pub fn compare_versions(current: &str, latest: &str) -> SyncResult<UpdateDecision> {
    let current = Version::parse(current.trim())?;
    let latest = Version::parse(latest.trim())?;

    Ok(match current.cmp(&latest) {
        std::cmp::Ordering::Equal => UpdateDecision::UpToDate,
        std::cmp::Ordering::Greater => UpdateDecision::NewerThanLatest,
        std::cmp::Ordering::Less => UpdateDecision::UpdateAvailable(latest),
    })
}
