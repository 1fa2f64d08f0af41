//! Results reported by cache orchestration operations.

use super::ToolCacheServiceResult;
use crate::tool_cache::domain::SourceName;
use tokio::task::JoinHandle;

/// Which path [`super::ToolDiscoveryCache::initialize_at_startup`] took.
#[derive(Debug)]
pub enum StartupOutcome {
    /// The cache was already loaded or loading; nothing was done.
    AlreadyInitialized,
    /// The snapshot was hydrated from persistence and reconciliation was
    /// started in the background.
    Hydrated {
        /// Number of tools now served.
        tool_count: usize,
        /// Handle of the background reconciliation.
        reconciliation: JoinHandle<ToolCacheServiceResult<ReconcileOutcome>>,
    },
    /// Every configured source was discovered and the result is being
    /// persisted in the background.
    Discovered {
        /// Number of tools now served.
        tool_count: usize,
        /// Handle of the background save.
        persistence: JoinHandle<ToolCacheServiceResult<()>>,
    },
    /// Discovery did not finish within the refresh timeout; the cache stays
    /// empty so a later call can retry.
    TimedOut,
}

/// Result of [`super::ToolDiscoveryCache::refresh_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot was rebuilt.
    Completed {
        /// Number of configured sources queried.
        sources: usize,
        /// Number of tools now served.
        tool_count: usize,
    },
    /// Another refresh was already in flight; nothing was started.
    AlreadyInProgress,
    /// The hard timeout elapsed; the previous snapshot is kept.
    TimedOut,
}

/// Sources touched by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Sources re-queried because their fingerprint was absent or stale.
    pub refreshed: Vec<SourceName>,
    /// Sources dropped because they left the configuration.
    pub evicted: Vec<SourceName>,
}

/// Result of [`super::ToolDiscoveryCache::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Reconciliation ran to completion.
    Completed(ReconcileReport),
    /// A refresh was already in flight; nothing was done.
    AlreadyInProgress,
    /// The reconciliation timeout elapsed; work done so far was kept.
    TimedOut,
}
