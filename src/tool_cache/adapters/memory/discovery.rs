//! In-memory discovery provider for deterministic tests and demos.

use crate::tool_cache::{
    domain::{SourceName, ToolEntry},
    ports::{DiscoveryError, DiscoveryProvider, DiscoveryResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Discovery provider backed by per-source catalogs held in memory.
///
/// Sources can be scripted to fail or to answer slowly, and every query is
/// counted, which makes stampede and timeout behaviour observable.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiscoveryProvider {
    state: Arc<RwLock<InMemoryDiscoveryState>>,
}

#[derive(Debug, Default)]
struct InMemoryDiscoveryState {
    catalogs: HashMap<SourceName, Vec<ToolEntry>>,
    failures: HashMap<SourceName, String>,
    delays: HashMap<SourceName, Duration>,
    calls: HashMap<SourceName, usize>,
}

impl InMemoryDiscoveryProvider {
    /// Creates a provider that knows no sources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tools `source` answers with. Existing entries are replaced.
    pub fn set_tool_catalog(&self, source: SourceName, tools: Vec<ToolEntry>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.catalogs.insert(source, tools);
    }

    /// Makes every query of `source` fail with `reason`.
    pub fn set_failure(&self, source: SourceName, reason: impl Into<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.failures.insert(source, reason.into().trim().to_owned());
    }

    /// Lets queries of `source` succeed again.
    pub fn clear_failure(&self, source: &SourceName) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.failures.remove(source);
    }

    /// Delays every answer from `source` by `delay`.
    pub fn set_delay(&self, source: SourceName, delay: Duration) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.delays.insert(source, delay);
    }

    /// Returns how many queries were started across all sources.
    #[must_use]
    pub fn call_count(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.calls.values().sum()
    }

    /// Returns how many queries of `source` were started.
    #[must_use]
    pub fn calls_for(&self, source: &SourceName) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.calls.get(source).copied().unwrap_or_default()
    }
}

#[async_trait]
impl DiscoveryProvider for InMemoryDiscoveryProvider {
    async fn list_tools(&self, source: &SourceName) -> DiscoveryResult<Vec<ToolEntry>> {
        let delay = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let calls = state.calls.entry(source.clone()).or_default();
            *calls = calls.saturating_add(1);
            state.delays.get(source).copied()
        };

        if let Some(pause) = delay {
            tokio::time::sleep(pause).await;
        }

        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(reason) = state.failures.get(source) {
            return Err(DiscoveryError::failed(source.clone(), reason.clone()));
        }

        Ok(state.catalogs.get(source).cloned().unwrap_or_default())
    }
}
