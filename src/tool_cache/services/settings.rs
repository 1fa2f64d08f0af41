//! Tunables for the tool discovery cache.

use crate::tool_cache::domain::{SourceName, ToolCacheDomainError, ToolEntry};
use std::time::Duration;

/// Default bound on a single source query.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default hard bound on a full refresh.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(45);

/// Default bound on background reconciliation.
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeouts and built-in tools used by [`super::ToolDiscoveryCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCacheSettings {
    operation_timeout: Duration,
    refresh_timeout: Duration,
    reconcile_timeout: Duration,
    internal_tools: Vec<ToolEntry>,
}

impl Default for ToolCacheSettings {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
            internal_tools: Vec::new(),
        }
    }
}

impl ToolCacheSettings {
    /// Creates settings with default timeouts and no built-in tools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-source and full-refresh timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheDomainError::RefreshTimeoutNotGreater`] unless
    /// `refresh` is strictly greater than `operation`.
    pub fn with_timeouts(
        mut self,
        operation: Duration,
        refresh: Duration,
    ) -> Result<Self, ToolCacheDomainError> {
        if refresh <= operation {
            return Err(ToolCacheDomainError::RefreshTimeoutNotGreater {
                operation_ms: operation.as_millis(),
                refresh_ms: refresh.as_millis(),
            });
        }
        self.operation_timeout = operation;
        self.refresh_timeout = refresh;
        Ok(self)
    }

    /// Sets the background reconciliation timeout.
    #[must_use]
    pub const fn with_reconcile_timeout(mut self, timeout: Duration) -> Self {
        self.reconcile_timeout = timeout;
        self
    }

    /// Sets the built-in tools served alongside discovered ones.
    ///
    /// Entries are re-attributed to the internal source.
    #[must_use]
    pub fn with_internal_tools(mut self, tools: impl IntoIterator<Item = ToolEntry>) -> Self {
        self.internal_tools = tools
            .into_iter()
            .map(|tool| tool.with_source(SourceName::internal()))
            .collect();
        self
    }

    /// Returns the bound on a single source query.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Returns the hard bound on a full refresh.
    #[must_use]
    pub const fn refresh_timeout(&self) -> Duration {
        self.refresh_timeout
    }

    /// Returns the bound on background reconciliation.
    #[must_use]
    pub const fn reconcile_timeout(&self) -> Duration {
        self.reconcile_timeout
    }

    /// Returns the built-in tools.
    #[must_use]
    pub fn internal_tools(&self) -> &[ToolEntry] {
        &self.internal_tools
    }
}
