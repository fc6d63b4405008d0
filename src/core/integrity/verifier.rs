use std::path::Path;

use tracing::{debug, warn};

use super::{hash_file, HashAlgorithm, IntegrityInfo, VerificationStrength};
use crate::core::error::{SyncError, SyncResult};

/// Outcome of checking one file against its expected digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The digest for this algorithm matched.
    Match(HashAlgorithm),
    Mismatch {
        algorithm: HashAlgorithm,
        expected: String,
        actual: String,
    },
    /// The file could not be read (missing, permissions, broken stream).
    Indeterminate(String),
    /// No expected digest exists; only the file name vouches for the file.
    NameOnly,
}

impl Verification {
    /// `Match` and `NameOnly` allow the file to be kept.
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Verification::Match(_) | Verification::NameOnly)
    }

    /// Convert into an error carrying `path` for the unacceptable outcomes.
    pub fn into_result(self, path: &Path) -> SyncResult<()> {
        match self {
            Verification::Match(_) | Verification::NameOnly => Ok(()),
            Verification::Mismatch {
                algorithm,
                expected,
                actual,
            } => Err(SyncError::IntegrityMismatch {
                path: path.to_path_buf(),
                algorithm,
                expected,
                actual,
            }),
            Verification::Indeterminate(reason) => Err(SyncError::IntegrityIndeterminate {
                path: path.to_path_buf(),
                reason,
            }),
        }
    }
}

/// Verifies files against [`IntegrityInfo`] using the preferred-strength
/// fallback policy.
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Pick which algorithms to check.
    ///
    /// With a preferred strength exactly one algorithm is returned: the
    /// preferred one if its digest exists, otherwise the closest stronger one,
    /// otherwise the closest weaker one. Without a preference every available
    /// algorithm is returned, strongest first.
    pub fn select_algorithms(
        expected: &IntegrityInfo,
        strength: Option<VerificationStrength>,
    ) -> Vec<HashAlgorithm> {
        let available = expected.available();
        let Some(strength) = strength else {
            return available.into_iter().rev().collect();
        };

        let preferred = strength.algorithm();
        let stronger = available.iter().copied().filter(|a| *a > preferred);
        let weaker = available.iter().copied().filter(|a| *a < preferred).rev();

        std::iter::once(preferred)
            .filter(|a| available.contains(a))
            .chain(stronger)
            .chain(weaker)
            .take(1)
            .collect()
    }

    pub async fn verify(
        path: &Path,
        expected: &IntegrityInfo,
        strength: Option<VerificationStrength>,
    ) -> Verification {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Verification::Indeterminate(format!("{:?} is not a file", path)),
            Err(e) => return Verification::Indeterminate(format!("{:?}: {}", path, e)),
        }

        let algorithms = Self::select_algorithms(expected, strength);
        if algorithms.is_empty() {
            warn!(
                "No expected hash for {:?}, accepting it by file name only",
                path
            );
            return Verification::NameOnly;
        }

        let mut last = None;
        for algorithm in algorithms {
            let Some(expected_digest) = expected.digest(algorithm) else {
                continue;
            };
            let actual = match hash_file(path, algorithm).await {
                Ok(actual) => actual,
                Err(e) => return Verification::Indeterminate(e.to_string()),
            };

            if !actual.eq_ignore_ascii_case(expected_digest) {
                debug!(
                    "{} mismatch for {:?}: expected {}, got {}",
                    algorithm, path, expected_digest, actual
                );
                return Verification::Mismatch {
                    algorithm,
                    expected: expected_digest.to_string(),
                    actual,
                };
            }
            last = Some(algorithm);
        }

        match last {
            Some(algorithm) => Verification::Match(algorithm),
            None => Verification::NameOnly,
        }
    }
}
