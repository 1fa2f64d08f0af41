//! Configuration port: the live set of configured tool sources.

use crate::tool_cache::domain::{SourceLaunchSpec, SourceName};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Read-only view of the configured external tool sources.
///
/// The cache never mutates configuration; it only fingerprints the launch
/// definitions it is handed. Malformed configuration is rejected upstream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceConfigProvider: Send + Sync {
    /// Returns a snapshot of every configured source keyed by name.
    async fn configured_sources(&self) -> BTreeMap<SourceName, SourceLaunchSpec>;
}
