//! Application services for tool discovery caching.

mod cache;
mod discovery;
mod outcome;
mod settings;

pub use cache::{ToolCacheServiceError, ToolCacheServiceResult, ToolDiscoveryCache};
pub use outcome::{ReconcileOutcome, ReconcileReport, RefreshOutcome, StartupOutcome};
pub use settings::{
    DEFAULT_OPERATION_TIMEOUT, DEFAULT_RECONCILE_TIMEOUT, DEFAULT_REFRESH_TIMEOUT,
    ToolCacheSettings,
};
