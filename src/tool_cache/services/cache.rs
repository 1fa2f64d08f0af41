//! Service layer orchestrating the tool snapshot, discovery, and persistence.

use super::discovery::{SourceResults, query_source, query_sources};
use super::{ReconcileOutcome, ReconcileReport, RefreshOutcome, StartupOutcome, ToolCacheSettings};
use crate::tool_cache::{
    domain::{
        CachePhase, CacheSnapshot, PersistedCatalog, SourceFingerprint, SourceLaunchSpec,
        SourceName, SourceStatus, ToolCacheDomainError, ToolEntry,
    },
    ports::{
        CatalogStore, CatalogStoreError, DiscoveryError, DiscoveryProvider, DiscoveryResult,
        SourceConfigProvider,
    },
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// Service-level errors for tool cache operations.
#[derive(Debug, Error)]
pub enum ToolCacheServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] ToolCacheDomainError),
    /// The catalog store rejected a save.
    #[error(transparent)]
    Store(#[from] CatalogStoreError),
    /// No source is configured under the given name.
    #[error("tool source {0} is not configured")]
    UnknownSource(SourceName),
    /// A blocking store task did not complete.
    #[error("catalog store task failed: {0}")]
    Task(#[from] JoinError),
}

/// Result type for tool cache service operations.
pub type ToolCacheServiceResult<T> = Result<T, ToolCacheServiceError>;

type SourceConfigs = BTreeMap<SourceName, SourceLaunchSpec>;

/// Process-wide tool discovery cache.
///
/// Serves a consistent snapshot of every known tool while refreshes run in
/// the background. At most one refresh holds the loading flag at a time;
/// readers never wait on discovery. Cloning is cheap and clones share state.
pub struct ToolDiscoveryCache<S, D, P, C>
where
    S: CatalogStore + 'static,
    D: DiscoveryProvider + 'static,
    P: SourceConfigProvider + 'static,
    C: Clock + Send + Sync + 'static,
{
    snapshot: Arc<RwLock<CacheSnapshot>>,
    store: Arc<S>,
    discovery: Arc<D>,
    config: Arc<P>,
    clock: Arc<C>,
    settings: Arc<ToolCacheSettings>,
}

impl<S, D, P, C> Clone for ToolDiscoveryCache<S, D, P, C>
where
    S: CatalogStore + 'static,
    D: DiscoveryProvider + 'static,
    P: SourceConfigProvider + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            snapshot: Arc::clone(&self.snapshot),
            store: Arc::clone(&self.store),
            discovery: Arc::clone(&self.discovery),
            config: Arc::clone(&self.config),
            clock: Arc::clone(&self.clock),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Holds the loading flag; releases it on drop, including when the owning
/// future is cancelled by a timeout.
struct LoadingGuard {
    snapshot: Arc<RwLock<CacheSnapshot>>,
}

impl LoadingGuard {
    fn claim(snapshot: &Arc<RwLock<CacheSnapshot>>, only_if_unloaded: bool) -> Option<Self> {
        let mut state = write_lock(snapshot);
        if only_if_unloaded && state.is_loaded() {
            return None;
        }
        state.try_begin_loading().then(|| Self {
            snapshot: Arc::clone(snapshot),
        })
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        write_lock(&self.snapshot).finish_loading();
    }
}

fn write_lock(snapshot: &RwLock<CacheSnapshot>) -> RwLockWriteGuard<'_, CacheSnapshot> {
    snapshot.write().unwrap_or_else(PoisonError::into_inner)
}

fn read_lock(snapshot: &RwLock<CacheSnapshot>) -> RwLockReadGuard<'_, CacheSnapshot> {
    snapshot.read().unwrap_or_else(PoisonError::into_inner)
}

impl<S, D, P, C> ToolDiscoveryCache<S, D, P, C>
where
    S: CatalogStore + 'static,
    D: DiscoveryProvider + 'static,
    P: SourceConfigProvider + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates an empty cache with default settings.
    #[must_use]
    pub fn new(store: Arc<S>, discovery: Arc<D>, config: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(CacheSnapshot::new())),
            store,
            discovery,
            config,
            clock,
            settings: Arc::new(ToolCacheSettings::default()),
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ToolCacheSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Returns the active settings.
    #[must_use]
    pub fn settings(&self) -> &ToolCacheSettings {
        &self.settings
    }

    /// Returns the current phase of the in-memory snapshot.
    #[must_use]
    pub fn phase(&self) -> CachePhase {
        read_lock(&self.snapshot).phase()
    }

    /// Returns a copy of the served tools, or `None` before the first load
    /// has completed.
    ///
    /// Never waits for discovery. Callers may mutate the copy freely.
    #[must_use]
    pub fn get_tools(&self) -> Option<Vec<ToolEntry>> {
        read_lock(&self.snapshot).tools()
    }

    /// Returns a copy of the served tools attributed to `source`.
    #[must_use]
    pub fn tools_for_source(&self, source: &SourceName) -> Vec<ToolEntry> {
        read_lock(&self.snapshot).tools_for(source)
    }

    /// Returns the latest status of every tracked source.
    #[must_use]
    pub fn statuses(&self) -> BTreeMap<SourceName, SourceStatus> {
        self.store.statuses()
    }

    /// Returns the fingerprints recorded for each source.
    #[must_use]
    pub fn persisted_fingerprints(&self) -> BTreeMap<SourceName, SourceFingerprint> {
        self.store.fingerprints()
    }

    /// Loads the cache once at process start.
    ///
    /// A persisted catalog with tools is served immediately and reconciled
    /// against the live configuration in the background. Otherwise every
    /// configured source is discovered before returning, and the result is
    /// persisted in the background. Calls after the first are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheServiceError::Task`] when the blocking catalog read
    /// cannot complete.
    pub async fn initialize_at_startup(&self) -> ToolCacheServiceResult<StartupOutcome> {
        let Some(loading) = LoadingGuard::claim(&self.snapshot, true) else {
            debug!("tool cache already initialised");
            return Ok(StartupOutcome::AlreadyInitialized);
        };

        let catalog = self.load_catalog().await?;
        if catalog.has_tools() {
            let tool_count = self.hydrate(&catalog);
            drop(loading);
            info!(tool_count, "serving persisted tool catalog; reconciling in background");
            let cache = self.clone();
            let reconciliation = tokio::spawn(async move { cache.reconcile().await });
            return Ok(StartupOutcome::Hydrated {
                tool_count,
                reconciliation,
            });
        }

        let refresh_timeout = self.settings.refresh_timeout();
        let Ok(rebuilt) = tokio::time::timeout(refresh_timeout, self.rebuild()).await else {
            warn!(
                timeout_ms = refresh_timeout.as_millis(),
                "startup discovery timed out; cache left empty"
            );
            return Ok(StartupOutcome::TimedOut);
        };
        let (sources, tool_count) = rebuilt?;
        drop(loading);
        info!(sources, tool_count, "discovered tools at startup");
        let cache = self.clone();
        let persistence = tokio::spawn(async move { cache.persist().await });
        Ok(StartupOutcome::Discovered {
            tool_count,
            persistence,
        })
    }

    /// Rebuilds the snapshot by querying every configured source.
    ///
    /// Sources that fail keep the entries they had before. Sources no longer
    /// configured are dropped. When another refresh is already running this
    /// returns [`RefreshOutcome::AlreadyInProgress`] without querying
    /// anything. When the refresh timeout elapses the in-flight queries are
    /// aborted and the previous snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheServiceError::Store`] when the rebuilt catalog
    /// cannot be saved; the new snapshot is served regardless.
    pub async fn refresh_all(&self) -> ToolCacheServiceResult<RefreshOutcome> {
        let Some(_loading) = LoadingGuard::claim(&self.snapshot, false) else {
            info!("tool refresh already in progress");
            return Ok(RefreshOutcome::AlreadyInProgress);
        };

        let refresh_timeout = self.settings.refresh_timeout();
        let Ok(rebuilt) = tokio::time::timeout(refresh_timeout, self.rebuild()).await else {
            warn!(
                timeout_ms = refresh_timeout.as_millis(),
                "tool refresh timed out; keeping previous snapshot"
            );
            return Ok(RefreshOutcome::TimedOut);
        };
        let (sources, tool_count) = rebuilt?;
        info!(sources, tool_count, "refreshed tool cache");
        self.persist().await?;
        Ok(RefreshOutcome::Completed {
            sources,
            tool_count,
        })
    }

    /// Re-queries a single configured source.
    ///
    /// On success its entries and fingerprint are replaced. On failure they
    /// are dropped and the status records the error. A query cut short by the
    /// operation timeout keeps the existing entries.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheServiceError::Domain`] for an invalid name,
    /// [`ToolCacheServiceError::UnknownSource`] when the source is not
    /// configured, or [`ToolCacheServiceError::Store`] when saving fails.
    pub async fn refresh_one(&self, name: &str) -> ToolCacheServiceResult<SourceStatus> {
        let source = SourceName::new(name)?;
        let configured = self.config.configured_sources().await;
        let spec = configured
            .get(&source)
            .ok_or_else(|| ToolCacheServiceError::UnknownSource(source.clone()))?;
        let previous = self.load_catalog().await?;

        let answer = query_source(
            self.discovery.as_ref(),
            &source,
            self.settings.operation_timeout(),
        )
        .await;
        let status = self.apply_answer(&source, spec, answer, &previous);
        self.persist().await?;
        Ok(status)
    }

    /// Installs the tools of a newly added source without re-querying the
    /// others. Returns how many tools were installed.
    ///
    /// Entries already held for the source are replaced. Before the first
    /// load only the catalog is updated; the snapshot picks it up on load.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheServiceError::Domain`] for an invalid name,
    /// [`ToolCacheServiceError::UnknownSource`] when the source is not
    /// configured, or [`ToolCacheServiceError::Store`] when saving fails.
    /// The in-memory update is kept when saving fails.
    pub async fn install_source(
        &self,
        name: &str,
        tools: Vec<ToolEntry>,
    ) -> ToolCacheServiceResult<usize> {
        let source = SourceName::new(name)?;
        let configured = self.config.configured_sources().await;
        let spec = configured
            .get(&source)
            .ok_or_else(|| ToolCacheServiceError::UnknownSource(source.clone()))?;
        self.load_catalog().await?;

        let tool_count = self.apply_install(&source, spec, tools);
        info!(source = %source, tool_count, "installed tool source");
        self.persist().await?;
        Ok(tool_count)
    }

    /// Drops every entry, fingerprint and status of a source. Returns how
    /// many served tools were removed.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheServiceError::Domain`] for an invalid name or
    /// [`ToolCacheServiceError::Store`] when saving fails.
    pub async fn remove_source(&self, name: &str) -> ToolCacheServiceResult<usize> {
        let source = SourceName::new(name)?;
        self.load_catalog().await?;

        let removed = self.evict(std::slice::from_ref(&source));
        info!(source = %source, removed, "removed tool source");
        self.persist().await?;
        Ok(removed)
    }

    /// Brings persisted state in line with the live configuration.
    ///
    /// Sources whose launch fingerprint is missing or differs from the
    /// recorded one are re-queried; sources no longer configured are
    /// evicted. The catalog is saved once at the end, also after the
    /// reconciliation timeout has cut the pass short.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheServiceError::Store`] when saving fails or
    /// [`ToolCacheServiceError::Task`] when the catalog read cannot complete.
    pub async fn reconcile(&self) -> ToolCacheServiceResult<ReconcileOutcome> {
        let Some(_loading) = LoadingGuard::claim(&self.snapshot, false) else {
            debug!("tool refresh in progress; skipping reconciliation");
            return Ok(ReconcileOutcome::AlreadyInProgress);
        };

        let reconcile_timeout = self.settings.reconcile_timeout();
        let outcome =
            match tokio::time::timeout(reconcile_timeout, self.reconcile_sources()).await {
                Ok(reconciled) => {
                    let report = reconciled?;
                    info!(
                        refreshed = report.refreshed.len(),
                        evicted = report.evicted.len(),
                        "reconciled tool cache"
                    );
                    ReconcileOutcome::Completed(report)
                }
                Err(_elapsed) => {
                    warn!(
                        timeout_ms = reconcile_timeout.as_millis(),
                        "reconciliation timed out; keeping work done so far"
                    );
                    ReconcileOutcome::TimedOut
                }
            };
        self.persist().await?;
        Ok(outcome)
    }

    /// Forgets the snapshot and the store's process-local catalog.
    ///
    /// Returns `false` and does nothing while a refresh is in flight.
    #[must_use]
    pub fn reset(&self) -> bool {
        let mut snapshot = write_lock(&self.snapshot);
        if snapshot.is_loading() {
            return false;
        }
        snapshot.clear();
        self.store.invalidate();
        true
    }

    async fn rebuild(&self) -> ToolCacheServiceResult<(usize, usize)> {
        let configured = self.config.configured_sources().await;
        let previous = self.load_catalog().await?;
        self.mark_pending(configured.keys(), &previous);
        let answers = query_sources(
            &self.discovery,
            configured.keys().cloned(),
            self.settings.operation_timeout(),
        )
        .await;
        let tool_count = self.apply_rebuild(&configured, &previous, answers);
        Ok((configured.len(), tool_count))
    }

    async fn reconcile_sources(&self) -> ToolCacheServiceResult<ReconcileReport> {
        let configured = self.config.configured_sources().await;
        let catalog = self.load_catalog().await?;

        let refreshed: Vec<SourceName> = configured
            .iter()
            .filter(|(source, spec)| {
                let live = SourceFingerprint::of(spec);
                let current = catalog.fingerprint(source) == Some(&live);
                if current {
                    debug!(source = %source, fingerprint = %live, "tool source unchanged");
                } else {
                    debug!(source = %source, fingerprint = %live, "tool source queued for refresh");
                }
                !current
            })
            .map(|(source, _)| source.clone())
            .collect();
        let evicted = unconfigured(&catalog, &configured);

        self.evict(&evicted);
        self.mark_pending(refreshed.iter(), &catalog);
        let answers = query_sources(
            &self.discovery,
            refreshed.iter().cloned(),
            self.settings.operation_timeout(),
        )
        .await;
        for (source, answer) in answers {
            if let Some(spec) = configured.get(&source) {
                self.apply_answer(&source, spec, answer, &catalog);
            }
        }
        Ok(ReconcileReport { refreshed, evicted })
    }

    fn hydrate(&self, catalog: &PersistedCatalog) -> usize {
        let tools: Vec<ToolEntry> = self
            .settings
            .internal_tools()
            .iter()
            .chain(
                catalog
                    .tools()
                    .iter()
                    .filter(|entry| !entry.source().is_internal()),
            )
            .cloned()
            .collect();
        let tool_count = tools.len();
        write_lock(&self.snapshot).replace(tools);
        tool_count
    }

    fn apply_rebuild(
        &self,
        configured: &SourceConfigs,
        previous: &PersistedCatalog,
        mut answers: SourceResults,
    ) -> usize {
        let now = self.clock.utc();
        let mut tools = self.settings.internal_tools().to_vec();
        let mut snapshot = write_lock(&self.snapshot);

        for (source, spec) in configured {
            let answer = answers.remove(source).unwrap_or_else(|| {
                Err(DiscoveryError::failed(source.clone(), "source was not queried"))
            });
            match answer {
                Ok(entries) => {
                    let discovered = attribute(entries, source);
                    debug!(source = %source, tool_count = discovered.len(), "discovered tools");
                    self.store.update_status(SourceStatus::healthy(
                        source.clone(),
                        discovered.len(),
                        now,
                    ));
                    tools.extend(discovered.iter().cloned());
                    self.store
                        .add_source_tools(source, discovered, SourceFingerprint::of(spec));
                }
                Err(error) => {
                    let status = status_after_failure(&error, previous.statuses().get(source), now);
                    self.store.update_status(status);
                    tools.extend(previous.tools_for(source));
                }
            }
        }

        for stale in unconfigured(previous, configured) {
            info!(source = %stale, "evicting tool source no longer configured");
            self.store.remove_source(&stale);
        }

        // Sources installed while discovery ran are absent from `configured`.
        self.store.inspect(Box::new(|current| {
            let installed = current.tools().iter().filter(|entry| {
                !entry.source().is_internal() && !configured.contains_key(entry.source())
            });
            tools.extend(installed.cloned());
        }));

        let tool_count = tools.len();
        snapshot.replace(tools);
        tool_count
    }

    fn mark_pending<'a>(
        &self,
        sources: impl Iterator<Item = &'a SourceName>,
        catalog: &PersistedCatalog,
    ) {
        let now = self.clock.utc();
        for source in sources.filter(|source| catalog.statuses().get(source).is_none()) {
            self.store.update_status(SourceStatus::loading(source.clone(), now));
        }
    }

    fn apply_answer(
        &self,
        source: &SourceName,
        spec: &SourceLaunchSpec,
        answer: DiscoveryResult<Vec<ToolEntry>>,
        previous: &PersistedCatalog,
    ) -> SourceStatus {
        let now = self.clock.utc();
        let mut snapshot = write_lock(&self.snapshot);
        let status = match answer {
            Ok(entries) => {
                let discovered = attribute(entries, source);
                info!(source = %source, tool_count = discovered.len(), "refreshed tool source");
                let healthy = SourceStatus::healthy(source.clone(), discovered.len(), now);
                snapshot.append_source(source, discovered.iter().cloned());
                self.store
                    .add_source_tools(source, discovered, SourceFingerprint::of(spec));
                healthy
            }
            Err(error) if error.is_cancellation() => {
                status_after_failure(&error, previous.statuses().get(source), now)
            }
            Err(error) => {
                snapshot.remove_source(source);
                self.store.remove_source(source);
                status_after_failure(&error, previous.statuses().get(source), now)
            }
        };
        self.store.update_status(status.clone());
        status
    }

    fn apply_install(
        &self,
        source: &SourceName,
        spec: &SourceLaunchSpec,
        tools: Vec<ToolEntry>,
    ) -> usize {
        let entries = attribute(tools, source);
        let tool_count = entries.len();
        let now = self.clock.utc();
        let mut snapshot = write_lock(&self.snapshot);
        snapshot.append_source(source, entries.iter().cloned());
        self.store
            .add_source_tools(source, entries, SourceFingerprint::of(spec));
        self.store
            .update_status(SourceStatus::healthy(source.clone(), tool_count, now));
        tool_count
    }

    fn evict(&self, sources: &[SourceName]) -> usize {
        let mut snapshot = write_lock(&self.snapshot);
        sources
            .iter()
            .map(|source| {
                debug!(source = %source, "evicting tool source");
                self.store.remove_source(source);
                snapshot.remove_source(source)
            })
            .sum()
    }

    async fn load_catalog(&self) -> ToolCacheServiceResult<PersistedCatalog> {
        let store = Arc::clone(&self.store);
        Ok(tokio::task::spawn_blocking(move || store.load()).await?)
    }

    async fn persist(&self) -> ToolCacheServiceResult<()> {
        let store = Arc::clone(&self.store);
        let saved = tokio::task::spawn_blocking(move || store.save()).await?;
        saved.inspect_err(|err| warn!(error = %err, "failed to persist tool catalog"))?;
        Ok(())
    }
}

fn attribute(entries: Vec<ToolEntry>, source: &SourceName) -> Vec<ToolEntry> {
    entries
        .into_iter()
        .map(|entry| entry.with_source(source.clone()))
        .collect()
}

fn unconfigured(catalog: &PersistedCatalog, configured: &SourceConfigs) -> Vec<SourceName> {
    catalog
        .known_sources()
        .into_iter()
        .filter(|source| !source.is_internal() && !configured.contains_key(source))
        .collect()
}

fn status_after_failure(
    error: &DiscoveryError,
    previous: Option<&SourceStatus>,
    now: DateTime<Utc>,
) -> SourceStatus {
    let source = error.source_name().clone();
    if error.is_cancellation() {
        warn!(source = %source, reason = error.reason(), "tool discovery interrupted");
        SourceStatus::interrupted(source, previous, error.reason(), now)
    } else {
        warn!(source = %source, reason = error.reason(), "tool discovery failed");
        SourceStatus::failed(source, error.reason(), now)
    }
}
