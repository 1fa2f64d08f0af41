//! Short, stable fingerprints of source launch definitions.
//!
//! A fingerprint is used to notice configuration drift between the launch
//! definition a source was last discovered with and the one currently
//! configured. It is meant to be scanned by eye in logs and the cache file,
//! so it is truncated to [`FINGERPRINT_LEN`] hex characters.

use super::{SourceLaunchSpec, ToolCacheDomainError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Number of digest bytes kept in a fingerprint.
const FINGERPRINT_BYTES: usize = 8;

/// Length in characters of every computed fingerprint.
pub const FINGERPRINT_LEN: usize = FINGERPRINT_BYTES * 2;

/// Fingerprint of a source launch definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFingerprint(String);

impl SourceFingerprint {
    /// Computes the fingerprint of a launch definition.
    #[must_use]
    pub fn of(spec: &SourceLaunchSpec) -> Self {
        fingerprint(spec.command(), spec.args(), spec.env())
    }

    /// Rebuilds a fingerprint read back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheDomainError::EmptyFingerprint`] when `value` is
    /// empty after trimming.
    pub fn from_persisted(value: impl Into<String>) -> Result<Self, ToolCacheDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ToolCacheDomainError::EmptyFingerprint);
        }
        Ok(Self(normalized))
    }

    /// Returns the fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceFingerprint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Computes the fingerprint of `command`, `args` and `env`.
///
/// Every component is tagged and length-prefixed before hashing, so moving a
/// value between the argument list and the environment, or splitting one
/// argument into two, always yields a different digest. Argument order is
/// significant; environment order is not.
#[must_use]
pub fn fingerprint(
    command: &str,
    args: &[String],
    env: &BTreeMap<String, String>,
) -> SourceFingerprint {
    let mut hasher = Sha256::new();
    absorb(&mut hasher, "cmd", command);
    for arg in args {
        absorb(&mut hasher, "arg", arg);
    }
    for (key, value) in env {
        absorb(&mut hasher, "env", key);
        absorb(&mut hasher, "val", value);
    }

    let digest = hasher.finalize();
    let prefix: Vec<u8> = digest.iter().copied().take(FINGERPRINT_BYTES).collect();
    SourceFingerprint(hex::encode(prefix))
}

fn absorb(hasher: &mut Sha256, tag: &str, value: &str) {
    hasher.update(tag.as_bytes());
    hasher.update(value.len().to_string().as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
}
