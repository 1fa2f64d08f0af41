//! Error types for tool cache domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing tool cache domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolCacheDomainError {
    /// The source name is empty after trimming.
    #[error("tool source name must not be empty")]
    EmptySourceName,

    /// The source name contains control characters.
    #[error("tool source name '{0}' contains control characters")]
    InvalidSourceName(String),

    /// The source name exceeds the storage limit.
    #[error("tool source name exceeds 100 character limit: {0}")]
    SourceNameTooLong(String),

    /// The launch command is empty.
    #[error("source launch command must not be empty")]
    EmptyLaunchCommand,

    /// A tool entry name is empty after trimming.
    #[error("tool name must not be empty")]
    EmptyToolName,

    /// A fingerprint string is empty.
    #[error("source fingerprint must not be empty")]
    EmptyFingerprint,

    /// The hard refresh timeout does not exceed the per-source timeout.
    #[error(
        "refresh timeout ({refresh_ms} ms) must be strictly greater than the operation timeout ({operation_ms} ms)"
    )]
    RefreshTimeoutNotGreater {
        /// Per-source operation timeout in milliseconds.
        operation_ms: u128,
        /// Outer refresh timeout in milliseconds.
        refresh_ms: u128,
    },
}

/// Error returned while parsing a source health status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown tool source status: {0}")]
pub struct ParseSourceHealthStatusError(pub String);
