//! Readers racing writers and refreshes.

use super::helpers::{TestContext, configure, context, source, tools};
use rstest::rstest;
use std::time::Duration;
use toolcache::tool_cache::services::RefreshOutcome;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_a_partial_source(context: TestContext) {
    configure(&context, "alpha", "alpha-server", Vec::new()).expect("configure alpha");
    context
        .cache
        .initialize_at_startup()
        .await
        .expect("startup should succeed");
    let alpha = source("alpha").expect("alpha");

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = context.cache.clone();
            let owner = alpha.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let served = cache.get_tools().expect("cache should stay loaded");
                    let from_alpha = served
                        .iter()
                        .filter(|entry| entry.belongs_to(&owner))
                        .count();
                    assert!(
                        from_alpha == 0 || from_alpha == 3,
                        "saw {from_alpha} alpha tools"
                    );
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for _ in 0..25 {
        context
            .cache
            .install_source("alpha", tools("alpha", 3).expect("alpha tools"))
            .await
            .expect("install should succeed");
        context
            .cache
            .remove_source("alpha")
            .await
            .expect("removal should succeed");
    }
    for reader in readers {
        reader.await.expect("reader should not panic");
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_refreshes_start_one_discovery(context: TestContext) {
    configure(&context, "alpha", "alpha-server", tools("alpha", 1).expect("tools"))
        .expect("configure alpha");
    context
        .discovery
        .set_delay(source("alpha").expect("alpha"), Duration::from_millis(150));

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let cache = context.cache.clone();
            tokio::spawn(async move { cache.refresh_all().await })
        })
        .collect();
    let mut completed = 0_usize;
    for attempt in attempts {
        let outcome = attempt
            .await
            .expect("refresh task should finish")
            .expect("refresh should succeed");
        if matches!(outcome, RefreshOutcome::Completed { .. }) {
            completed += 1;
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(context.discovery.call_count(), 1);
}
