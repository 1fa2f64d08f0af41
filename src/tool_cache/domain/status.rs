//! Per-source health records and the tracker that holds them.

use super::{ParseSourceHealthStatusError, SourceName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Last known health of a tool source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHealthStatus {
    /// The last discovery succeeded.
    Healthy,
    /// The last discovery failed.
    Error,
    /// A discovery is in flight or has not completed yet.
    Loading,
}

impl SourceHealthStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Error => "error",
            Self::Loading => "loading",
        }
    }
}

impl fmt::Display for SourceHealthStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SourceHealthStatus {
    type Error = ParseSourceHealthStatusError;

    fn try_from(value: &str) -> Result<Self, ParseSourceHealthStatusError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "healthy" => Ok(Self::Healthy),
            "error" => Ok(Self::Error),
            "loading" => Ok(Self::Loading),
            _ => Err(ParseSourceHealthStatusError(value.to_owned())),
        }
    }
}

/// Timestamped health record of one source.
///
/// Written explicitly by whichever operation queried the source, so a
/// healthy source with zero tools stays distinguishable from one that
/// failed outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    name: SourceName,
    status: SourceHealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    tool_count: usize,
    last_check: DateTime<Utc>,
}

impl SourceStatus {
    /// Creates a status record.
    #[must_use]
    pub const fn new(
        name: SourceName,
        status: SourceHealthStatus,
        tool_count: usize,
        last_check: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            status,
            error: None,
            tool_count,
            last_check,
        }
    }

    /// Records a successful discovery of `tool_count` tools.
    #[must_use]
    pub const fn healthy(name: SourceName, tool_count: usize, last_check: DateTime<Utc>) -> Self {
        Self::new(name, SourceHealthStatus::Healthy, tool_count, last_check)
    }

    /// Records a source whose discovery is still pending.
    #[must_use]
    pub const fn loading(name: SourceName, last_check: DateTime<Utc>) -> Self {
        Self::new(name, SourceHealthStatus::Loading, 0, last_check)
    }

    /// Records a failed discovery.
    #[must_use]
    pub fn failed(name: SourceName, error: impl Into<String>, last_check: DateTime<Utc>) -> Self {
        Self::new(name, SourceHealthStatus::Error, 0, last_check).with_error(error)
    }

    /// Records a discovery that was cut short by our own deadline.
    ///
    /// The previous health is carried over rather than flipped to
    /// [`SourceHealthStatus::Error`]; a source without history stays
    /// [`SourceHealthStatus::Loading`].
    #[must_use]
    pub fn interrupted(
        name: SourceName,
        previous: Option<&Self>,
        reason: impl Into<String>,
        last_check: DateTime<Utc>,
    ) -> Self {
        let (status, tool_count) = previous.map_or((SourceHealthStatus::Loading, 0), |prior| {
            (prior.status, prior.tool_count)
        });
        Self::new(name, status, tool_count, last_check).with_error(reason)
    }

    /// Attaches an error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        let normalized = error.into().trim().to_owned();
        if !normalized.is_empty() {
            self.error = Some(normalized);
        }
        self
    }

    /// Returns the source name.
    #[must_use]
    pub const fn name(&self) -> &SourceName {
        &self.name
    }

    /// Returns the health status.
    #[must_use]
    pub const fn status(&self) -> SourceHealthStatus {
        self.status
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the number of tools found by the last successful query.
    #[must_use]
    pub const fn tool_count(&self) -> usize {
        self.tool_count
    }

    /// Returns when the source was last queried.
    #[must_use]
    pub const fn last_check(&self) -> DateTime<Utc> {
        self.last_check
    }
}

/// Status records keyed by source name.
///
/// Nothing is derived automatically: every component that queries a source
/// reports the outcome here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceStatusTracker {
    statuses: BTreeMap<SourceName, SourceStatus>,
}

impl SourceStatusTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `status`, replacing any earlier record for the same source.
    pub fn update(&mut self, status: SourceStatus) {
        self.statuses.insert(status.name().clone(), status);
    }

    /// Returns the record for `name`.
    #[must_use]
    pub fn get(&self, name: &SourceName) -> Option<&SourceStatus> {
        self.statuses.get(name)
    }

    /// Returns a copy of every record.
    #[must_use]
    pub fn all(&self) -> BTreeMap<SourceName, SourceStatus> {
        self.statuses.clone()
    }

    /// Removes and returns the record for `name`.
    pub fn remove(&mut self, name: &SourceName) -> Option<SourceStatus> {
        self.statuses.remove(name)
    }

    /// Returns the names of every tracked source.
    pub fn names(&self) -> impl Iterator<Item = &SourceName> {
        self.statuses.keys()
    }

    /// Returns the number of tracked sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Returns whether no source is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
