//! End-to-end tool cache lifecycle over in-memory adapters.

use super::helpers::{TestContext, configure, context, served_names, source, tools};
use rstest::rstest;
use toolcache::tool_cache::{
    domain::{CachePhase, SourceHealthStatus, SourceStatus},
    services::{RefreshOutcome, StartupOutcome},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cache_follows_sources_through_their_lifecycle(context: TestContext) {
    configure(&context, "alpha", "alpha-server", tools("alpha", 3).expect("alpha tools"))
        .expect("configure alpha");
    configure(&context, "beta", "beta-server", Vec::new()).expect("configure beta");
    context
        .discovery
        .set_failure(source("beta").expect("beta"), "handshake failed");

    let startup = context
        .cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");
    let StartupOutcome::Discovered { persistence, .. } = startup else {
        panic!("expected fresh discovery, got {startup:?}");
    };
    persistence
        .await
        .expect("persistence task should finish")
        .expect("save should succeed");
    assert_eq!(context.cache.phase(), CachePhase::Ready);
    assert_eq!(
        served_names(&context.cache),
        vec!["alpha_1", "alpha_2", "alpha_3", "http_get"]
    );
    let statuses = context.cache.statuses();
    let alpha_status = statuses
        .get(&source("alpha").expect("alpha"))
        .expect("alpha status");
    assert_eq!(alpha_status.status(), SourceHealthStatus::Healthy);
    assert_eq!(alpha_status.tool_count(), 3);
    assert_eq!(
        statuses
            .get(&source("beta").expect("beta"))
            .map(SourceStatus::status),
        Some(SourceHealthStatus::Error)
    );
    let persisted = context.store.saved().expect("catalog should be saved");
    assert!(persisted.fingerprint(&source("alpha").expect("alpha")).is_some());
    assert!(persisted.fingerprint(&source("beta").expect("beta")).is_none());

    // beta recovers and is installed by whoever fixed it
    let beta = source("beta").expect("beta");
    context.discovery.clear_failure(&beta);
    context
        .discovery
        .set_tool_catalog(beta, tools("beta", 1).expect("beta tools"));
    context
        .cache
        .install_source("beta", tools("beta", 1).expect("beta tools"))
        .await
        .expect("install should succeed");
    assert_eq!(
        served_names(&context.cache),
        vec!["alpha_1", "alpha_2", "alpha_3", "beta_1", "http_get"]
    );

    context
        .cache
        .remove_source("alpha")
        .await
        .expect("removal should succeed");
    context
        .config
        .remove_source(&source("alpha").expect("alpha"));
    let refreshed = context
        .cache
        .refresh_all()
        .await
        .expect("refresh should succeed");

    assert_eq!(
        refreshed,
        RefreshOutcome::Completed {
            sources: 1,
            tool_count: 2
        }
    );
    assert_eq!(served_names(&context.cache), vec!["beta_1", "http_get"]);
    let saved = context.store.saved().expect("catalog should be saved");
    assert!(
        saved
            .tools()
            .iter()
            .all(|entry| !entry.source().is_internal())
    );
    assert_eq!(saved.tools().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn statuses_cover_every_configured_source(context: TestContext) {
    for (name, count) in [("alpha", 1), ("beta", 3), ("gamma", 0)] {
        configure(&context, name, name, tools(name, count).expect("tools"))
            .expect("configure source");
    }

    context
        .cache
        .refresh_all()
        .await
        .expect("refresh should succeed");

    let statuses = context.cache.statuses();
    let counts: Vec<(String, usize)> = statuses
        .values()
        .map(|status| (status.name().as_str().to_owned(), status.tool_count()))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("alpha".to_owned(), 1),
            ("beta".to_owned(), 3),
            ("gamma".to_owned(), 0)
        ]
    );
}
