// ─── Integrity ───
// Hash algorithms, expected-digest metadata and the verifier that picks
// which of them to check.

mod hasher;
mod verifier;

use serde::{Deserialize, Serialize};

pub use hasher::{hash_file, hash_str};
pub use verifier::{IntegrityVerifier, Verification};

/// Supported digests, ordered from weakest/fastest to strongest/slowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
    ];
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Md5 => write!(f, "md5"),
            HashAlgorithm::Sha1 => write!(f, "sha1"),
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Preferred verification strength declared by the manifest.
///
/// Each level maps to exactly one algorithm; when the manifest has no digest
/// for it the verifier falls back to another one that is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStrength {
    Fastest,
    Fast,
    Medium,
    Strongest,
}

impl VerificationStrength {
    pub fn algorithm(self) -> HashAlgorithm {
        match self {
            VerificationStrength::Fastest => HashAlgorithm::Md5,
            VerificationStrength::Fast => HashAlgorithm::Sha1,
            VerificationStrength::Medium => HashAlgorithm::Sha256,
            VerificationStrength::Strongest => HashAlgorithm::Sha512,
        }
    }
}

impl Default for VerificationStrength {
    fn default() -> Self {
        VerificationStrength::Medium
    }
}

/// Expected digests for one file. Every field is optional; an empty value
/// degrades verification to a file-name check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,
}

impl IntegrityInfo {
    /// Expected digest for `algorithm`, ignoring blank entries.
    pub fn digest(&self, algorithm: HashAlgorithm) -> Option<&str> {
        let value = match algorithm {
            HashAlgorithm::Md5 => self.md5.as_deref(),
            HashAlgorithm::Sha1 => self.sha1.as_deref(),
            HashAlgorithm::Sha256 => self.sha256.as_deref(),
            HashAlgorithm::Sha512 => self.sha512.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    /// Algorithms with an expected digest, weakest first.
    pub fn available(&self) -> Vec<HashAlgorithm> {
        HashAlgorithm::ALL
            .into_iter()
            .filter(|a| self.digest(*a).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.available().is_empty()
    }

    pub fn with(mut self, algorithm: HashAlgorithm, digest: impl Into<String>) -> Self {
        let digest = Some(digest.into());
        match algorithm {
            HashAlgorithm::Md5 => self.md5 = digest,
            HashAlgorithm::Sha1 => self.sha1 = digest,
            HashAlgorithm::Sha256 => self.sha256 = digest,
            HashAlgorithm::Sha512 => self.sha512 = digest,
        }
        self
    }
}
