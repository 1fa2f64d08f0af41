//! Bounded, concurrent fan-out of discovery queries.

use crate::tool_cache::{
    domain::{SourceName, ToolEntry},
    ports::{DiscoveryError, DiscoveryProvider, DiscoveryResult},
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Per-source answers, keyed by source name.
pub(super) type SourceResults = BTreeMap<SourceName, DiscoveryResult<Vec<ToolEntry>>>;

/// Queries one source, converting an elapsed `timeout` into a cancellation.
pub(super) async fn query_source<D>(
    discovery: &D,
    source: &SourceName,
    timeout: Duration,
) -> DiscoveryResult<Vec<ToolEntry>>
where
    D: DiscoveryProvider + ?Sized,
{
    debug!(source = %source, "querying tool source");
    match tokio::time::timeout(timeout, discovery.list_tools(source)).await {
        Ok(answer) => answer,
        Err(_elapsed) => Err(DiscoveryError::timed_out(source.clone(), timeout)),
    }
}

/// Queries every source concurrently.
///
/// Each query runs as its own task bounded by `timeout`. Dropping the
/// returned future aborts the tasks still running, so no answer can land
/// after the caller has given up. Every requested source gets an entry in
/// the result, even when its task panicked.
pub(super) async fn query_sources<D>(
    discovery: &Arc<D>,
    sources: impl IntoIterator<Item = SourceName>,
    timeout: Duration,
) -> SourceResults
where
    D: DiscoveryProvider + 'static,
{
    let mut tasks = JoinSet::new();
    let mut pending = BTreeSet::new();
    for source in sources {
        pending.insert(source.clone());
        let provider = Arc::clone(discovery);
        tasks.spawn(async move {
            let answer = query_source(provider.as_ref(), &source, timeout).await;
            (source, answer)
        });
    }

    let mut results = SourceResults::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((source, answer)) => {
                pending.remove(&source);
                results.insert(source, answer);
            }
            Err(err) => warn!(error = %err, "discovery task ended without an answer"),
        }
    }
    for source in pending {
        let failure = DiscoveryError::failed(source.clone(), "discovery task ended without an answer");
        results.insert(source, Err(failure));
    }
    results
}
