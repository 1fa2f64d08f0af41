//! Configuration provider holding source definitions in memory.

use crate::tool_cache::{
    domain::{SourceLaunchSpec, SourceName},
    ports::SourceConfigProvider,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration provider over a mutable in-memory source map.
///
/// Hosts that already parsed their configuration hand the result over here;
/// tests edit it to simulate configuration drift.
#[derive(Debug, Clone, Default)]
pub struct StaticSourceConfig {
    sources: Arc<RwLock<BTreeMap<SourceName, SourceLaunchSpec>>>,
}

impl StaticSourceConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from existing source definitions.
    #[must_use]
    pub fn from_sources(sources: impl IntoIterator<Item = (SourceName, SourceLaunchSpec)>) -> Self {
        Self {
            sources: Arc::new(RwLock::new(sources.into_iter().collect())),
        }
    }

    /// Adds or replaces the definition of `name`.
    pub fn set_source(&self, name: SourceName, spec: SourceLaunchSpec) {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name, spec);
    }

    /// Removes the definition of `name`.
    pub fn remove_source(&self, name: &SourceName) -> Option<SourceLaunchSpec> {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.remove(name)
    }
}

#[async_trait]
impl SourceConfigProvider for StaticSourceConfig {
    async fn configured_sources(&self) -> BTreeMap<SourceName, SourceLaunchSpec> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
