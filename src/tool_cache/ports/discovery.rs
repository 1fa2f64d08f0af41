//! Discovery port: querying a source for its current tools.

use crate::tool_cache::domain::{SourceName, ToolEntry};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Capability that lists the tools a source currently exposes.
///
/// Implementations may block on subprocess start-up and protocol
/// handshakes. Callers bound every call with a deadline and drop the
/// returned future when it elapses, so implementations must tolerate being
/// cancelled at any await point.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// Lists the tools exposed by `source`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Failed`] when the source cannot be queried
    /// and [`DiscoveryError::Cancelled`] when the query was abandoned
    /// before the source answered.
    async fn list_tools(&self, source: &SourceName) -> DiscoveryResult<Vec<ToolEntry>>;
}

/// Errors returned by discovery providers.
///
/// Only two classes matter to the cache: the source genuinely failed, or we
/// stopped waiting for it. The reason strings are opaque and meant for
/// direct display.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The source reported a real failure.
    #[error("discovery of tool source {source_name} failed: {reason}")]
    Failed {
        /// Source that was queried.
        source_name: SourceName,
        /// Display-ready failure reason.
        reason: String,
    },

    /// The query was cut short by the caller's deadline.
    #[error("discovery of tool source {source_name} was cancelled: {reason}")]
    Cancelled {
        /// Source that was queried.
        source_name: SourceName,
        /// Display-ready cancellation reason.
        reason: String,
    },
}

impl DiscoveryError {
    /// Builds a failure reported by the source itself.
    pub fn failed(source_name: SourceName, reason: impl Into<String>) -> Self {
        Self::Failed {
            source_name,
            reason: reason.into(),
        }
    }

    /// Builds a cancellation.
    pub fn cancelled(source_name: SourceName, reason: impl Into<String>) -> Self {
        Self::Cancelled {
            source_name,
            reason: reason.into(),
        }
    }

    /// Builds the cancellation recorded when `timeout` elapses.
    #[must_use]
    pub fn timed_out(source_name: SourceName, timeout: Duration) -> Self {
        Self::cancelled(
            source_name,
            format!("no answer within {} ms", timeout.as_millis()),
        )
    }

    /// Returns whether this error is a symptom of our own deadline rather
    /// than evidence that the source is broken.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the queried source.
    #[must_use]
    pub const fn source_name(&self) -> &SourceName {
        match self {
            Self::Failed { source_name, .. } | Self::Cancelled { source_name, .. } => source_name,
        }
    }

    /// Returns the display-ready reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Failed { reason, .. } | Self::Cancelled { reason, .. } => reason,
        }
    }
}
