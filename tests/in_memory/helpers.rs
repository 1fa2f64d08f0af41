//! Shared helpers for in-memory tool cache integration tests.

use eyre::{Result, WrapErr};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use std::time::Duration;
use toolcache::tool_cache::{
    adapters::memory::{InMemoryCatalogStore, InMemoryDiscoveryProvider, StaticSourceConfig},
    domain::{SourceLaunchSpec, SourceName, ToolEntry},
    services::{ToolCacheSettings, ToolDiscoveryCache},
};

/// Cache type wired to in-memory adapters.
pub type MemoryCache = ToolDiscoveryCache<
    InMemoryCatalogStore,
    InMemoryDiscoveryProvider,
    StaticSourceConfig,
    DefaultClock,
>;

/// A cache plus handles to the adapters behind it.
pub struct TestContext {
    /// Cache under test.
    pub cache: MemoryCache,
    /// Store shared with the cache.
    pub store: InMemoryCatalogStore,
    /// Discovery provider shared with the cache.
    pub discovery: InMemoryDiscoveryProvider,
    /// Configuration shared with the cache.
    pub config: StaticSourceConfig,
}

/// Provides a cache with short timeouts and one built-in tool.
///
/// # Panics
///
/// Panics if the fixed test settings are rejected.
#[fixture]
pub fn context() -> TestContext {
    build_context().expect("test context should build")
}

fn build_context() -> Result<TestContext> {
    let settings = ToolCacheSettings::new()
        .with_timeouts(Duration::from_millis(300), Duration::from_millis(800))
        .wrap_err("test timeouts")?
        .with_internal_tools([ToolEntry::internal("http_get", "Fetches a URL")?]);
    let store = InMemoryCatalogStore::new();
    let discovery = InMemoryDiscoveryProvider::new();
    let config = StaticSourceConfig::new();
    let cache = ToolDiscoveryCache::new(
        Arc::new(store.clone()),
        Arc::new(discovery.clone()),
        Arc::new(config.clone()),
        Arc::new(DefaultClock),
    )
    .with_settings(settings);
    Ok(TestContext {
        cache,
        store,
        discovery,
        config,
    })
}

/// Parses a source name.
///
/// # Errors
///
/// Returns an error if the name is invalid.
pub fn source(value: &str) -> Result<SourceName> {
    SourceName::new(value).wrap_err_with(|| format!("source name {value}"))
}

/// Builds `count` tools for `source_name`, named `{source_name}_{n}`.
///
/// # Errors
///
/// Returns an error if the source name is invalid.
pub fn tools(source_name: &str, count: usize) -> Result<Vec<ToolEntry>> {
    let owner = source(source_name)?;
    (1..=count)
        .map(|index| {
            ToolEntry::new(format!("{source_name}_{index}"), "", owner.clone())
                .wrap_err("tool entry")
        })
        .collect()
}

/// Configures `source_name` launched by `command` and scripts its answer.
///
/// # Errors
///
/// Returns an error if the name or command is invalid.
pub fn configure(
    context: &TestContext,
    source_name: &str,
    command: &str,
    answer: Vec<ToolEntry>,
) -> Result<()> {
    let name = source(source_name)?;
    context
        .config
        .set_source(name.clone(), SourceLaunchSpec::new(command)?);
    context.discovery.set_tool_catalog(name, answer);
    Ok(())
}

/// Returns the served tool names, sorted.
#[must_use]
pub fn served_names(cache: &MemoryCache) -> Vec<String> {
    let mut names: Vec<String> = cache
        .get_tools()
        .unwrap_or_default()
        .iter()
        .map(|entry| entry.name().to_owned())
        .collect();
    names.sort();
    names
}
