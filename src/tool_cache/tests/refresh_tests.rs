//! Startup, full refresh, and timeout behaviour of the tool cache.

use super::fixtures::{
    Harness, StalledConfig, fast_settings, harness, launch, name, persisted, tool,
};
use crate::tool_cache::{
    adapters::memory::{InMemoryCatalogStore, InMemoryDiscoveryProvider},
    domain::{CachePhase, SourceHealthStatus, ToolEntry},
    services::{RefreshOutcome, StartupOutcome, ToolCacheServiceError, ToolDiscoveryCache},
};
use mockable::DefaultClock;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

#[rstest]
fn tools_are_unavailable_before_startup(harness: Harness) {
    assert_eq!(harness.cache.get_tools(), None);
    assert_eq!(harness.cache.phase(), CachePhase::Empty);
}

#[tokio::test(flavor = "multi_thread")]
async fn startup_without_sources_serves_only_internal_tools() {
    let store = InMemoryCatalogStore::new();
    let harness = Harness::with_store(store.clone());
    let internal = ToolEntry::internal("http_get", "Fetches a URL").expect("valid tool entry");
    let cache = harness
        .cache
        .clone()
        .with_settings(fast_settings().with_internal_tools([internal]));

    let outcome = cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");

    let StartupOutcome::Discovered {
        tool_count,
        persistence,
    } = outcome
    else {
        panic!("expected a fresh discovery, got {outcome:?}");
    };
    assert_eq!(tool_count, 1);
    persistence
        .await
        .expect("persistence task should finish")
        .expect("save should succeed");
    let saved = store.saved().expect("catalog should be saved");
    assert!(!saved.has_tools(), "internal tools must not be persisted");
    assert_eq!(cache.phase(), CachePhase::Ready);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn startup_discovery_records_fingerprints_only_for_healthy_sources(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha"), tool("fetch", "alpha")]);
    harness.add_source("beta", Vec::new());
    harness.discovery.set_failure(name("beta"), "connection refused");

    let outcome = harness
        .cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");

    assert!(matches!(outcome, StartupOutcome::Discovered { tool_count: 2, .. }));
    assert_eq!(harness.tool_names(), vec!["fetch", "search"]);

    let statuses = harness.cache.statuses();
    let alpha = statuses.get(&name("alpha")).expect("alpha status");
    assert_eq!(alpha.status(), SourceHealthStatus::Healthy);
    assert_eq!(alpha.tool_count(), 2);
    let beta = statuses.get(&name("beta")).expect("beta status");
    assert_eq!(beta.status(), SourceHealthStatus::Error);
    assert_eq!(beta.error(), Some("connection refused"));

    let fingerprints = harness.cache.persisted_fingerprints();
    assert!(fingerprints.contains_key(&name("alpha")));
    assert!(!fingerprints.contains_key(&name("beta")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn startup_runs_once(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha")]);

    harness
        .cache
        .initialize_at_startup()
        .await
        .expect("first startup should succeed");
    let second = harness
        .cache
        .initialize_at_startup()
        .await
        .expect("second startup should succeed");

    assert!(matches!(second, StartupOutcome::AlreadyInitialized));
    assert_eq!(harness.discovery.calls_for(&name("alpha")), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn startup_serves_persisted_catalog_without_querying() {
    let alpha_launch = launch("alpha");
    let store = InMemoryCatalogStore::with_saved(persisted(&[(
        "alpha",
        &alpha_launch,
        vec![tool("search", "alpha")],
    )]));
    let harness = Harness::with_store(store);
    harness.config.set_source(name("alpha"), alpha_launch);

    let outcome = harness
        .cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");

    let StartupOutcome::Hydrated {
        tool_count,
        reconciliation,
    } = outcome
    else {
        panic!("expected hydration from persistence, got {outcome:?}");
    };
    assert_eq!(tool_count, 1);
    assert_eq!(harness.tool_names(), vec!["search"]);
    reconciliation
        .await
        .expect("reconciliation task should finish")
        .expect("reconciliation should succeed");
    assert_eq!(harness.discovery.call_count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn overlapping_refreshes_query_each_source_once(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha")]);
    harness
        .discovery
        .set_delay(name("alpha"), Duration::from_millis(150));

    let first = {
        let cache = harness.cache.clone();
        tokio::spawn(async move { cache.refresh_all().await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = harness
        .cache
        .refresh_all()
        .await
        .expect("second refresh should return");
    let completed = first
        .await
        .expect("refresh task should finish")
        .expect("first refresh should succeed");

    assert_eq!(second, RefreshOutcome::AlreadyInProgress);
    assert_eq!(
        completed,
        RefreshOutcome::Completed {
            sources: 1,
            tool_count: 1
        }
    );
    assert_eq!(harness.discovery.calls_for(&name("alpha")), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn hard_timeout_releases_the_loading_flag() {
    let discovery = InMemoryDiscoveryProvider::new();
    let cache = ToolDiscoveryCache::new(
        Arc::new(InMemoryCatalogStore::new()),
        Arc::new(discovery.clone()),
        Arc::new(StalledConfig {
            delay: Duration::from_secs(5),
        }),
        Arc::new(DefaultClock),
    )
    .with_settings(fast_settings());

    let first = cache.refresh_all().await.expect("refresh should return");
    assert_eq!(first, RefreshOutcome::TimedOut);
    assert_eq!(cache.phase(), CachePhase::Empty);

    let second = cache.refresh_all().await.expect("refresh should return");
    assert_eq!(second, RefreshOutcome::TimedOut, "flag must not stay held");
    assert_eq!(discovery.call_count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_source_keeps_previous_tools_on_refresh(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha")]);
    harness
        .cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");
    let fingerprint_before = harness.cache.persisted_fingerprints();

    harness.discovery.set_failure(name("alpha"), "server crashed");
    harness
        .cache
        .refresh_all()
        .await
        .expect("refresh should succeed");

    assert_eq!(harness.tool_names(), vec!["search"]);
    assert_eq!(harness.cache.persisted_fingerprints(), fingerprint_before);
    let statuses = harness.cache.statuses();
    let alpha = statuses.get(&name("alpha")).expect("alpha status");
    assert_eq!(alpha.status(), SourceHealthStatus::Error);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_source_is_interrupted_not_marked_broken(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha")]);
    harness
        .cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");

    harness
        .discovery
        .set_delay(name("alpha"), Duration::from_secs(2));
    let outcome = harness
        .cache
        .refresh_all()
        .await
        .expect("refresh should succeed");

    assert!(matches!(outcome, RefreshOutcome::Completed { .. }));
    assert_eq!(harness.tool_names(), vec!["search"]);
    let statuses = harness.cache.statuses();
    let alpha = statuses.get(&name("alpha")).expect("alpha status");
    assert_eq!(alpha.status(), SourceHealthStatus::Healthy);
    assert_eq!(alpha.tool_count(), 1);
    assert!(alpha.error().is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refresh_drops_sources_removed_from_configuration(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha")]);
    harness.add_source("beta", vec![tool("lookup", "beta")]);
    harness
        .cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");

    harness.config.remove_source(&name("beta"));
    harness
        .cache
        .refresh_all()
        .await
        .expect("refresh should succeed");

    assert_eq!(harness.tool_names(), vec!["search"]);
    assert!(!harness.cache.statuses().contains_key(&name("beta")));
    assert!(!harness.cache.persisted_fingerprints().contains_key(&name("beta")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_save_is_reported_but_snapshot_is_served(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha")]);
    harness.store.fail_saves(Some("disk full"));

    let result = harness.cache.refresh_all().await;

    assert!(matches!(result, Err(ToolCacheServiceError::Store(_))));
    assert_eq!(harness.tool_names(), vec!["search"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reset_returns_to_the_empty_phase(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha")]);
    harness
        .cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");

    assert!(harness.cache.reset());

    assert_eq!(harness.cache.get_tools(), None);
    assert_eq!(harness.cache.phase(), CachePhase::Empty);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn source_installed_during_refresh_stays_served(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha")]);
    harness
        .cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");
    harness
        .discovery
        .set_delay(name("alpha"), Duration::from_millis(150));

    let cache = harness.cache.clone();
    let refresh = tokio::spawn(async move { cache.refresh_all().await });
    tokio::time::sleep(Duration::from_millis(40)).await;
    harness.config.set_source(name("gamma"), launch("gamma"));
    harness
        .cache
        .install_source("gamma", vec![tool("g1", "gamma")])
        .await
        .expect("install should succeed");

    let outcome = refresh
        .await
        .expect("refresh task should finish")
        .expect("refresh should succeed");

    assert!(matches!(outcome, RefreshOutcome::Completed { sources: 1, .. }));
    assert_eq!(harness.tool_names(), vec!["g1", "search"]);
    let statuses = harness.cache.statuses();
    let gamma = statuses.get(&name("gamma")).expect("gamma status");
    assert_eq!(gamma.status(), SourceHealthStatus::Healthy);
    assert_eq!(gamma.tool_count(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sources_report_loading_while_startup_discovery_runs(harness: Harness) {
    harness.add_source("alpha", vec![tool("search", "alpha")]);
    harness
        .discovery
        .set_delay(name("alpha"), Duration::from_millis(150));

    let cache = harness.cache.clone();
    let startup = tokio::spawn(async move { cache.initialize_at_startup().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let pending = harness.cache.statuses();
    let alpha = pending.get(&name("alpha")).expect("alpha status");
    assert_eq!(alpha.status(), SourceHealthStatus::Loading);
    assert_eq!(alpha.tool_count(), 0);

    let outcome = startup
        .await
        .expect("startup task should finish")
        .expect("startup should succeed");
    assert!(matches!(outcome, StartupOutcome::Discovered { tool_count: 1, .. }));
    let settled = harness.cache.statuses();
    let healthy = settled.get(&name("alpha")).expect("alpha status");
    assert_eq!(healthy.status(), SourceHealthStatus::Healthy);
}
