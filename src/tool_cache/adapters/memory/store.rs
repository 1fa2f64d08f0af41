//! In-memory catalog store.

use crate::tool_cache::{
    domain::PersistedCatalog,
    ports::{CatalogStore, CatalogStoreError, CatalogStoreResult},
};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Catalog store whose "backing medium" is a value held in memory.
///
/// It separates the saved catalog from the process-local copy the same way
/// the file store does, so load/save/invalidate semantics can be exercised
/// without touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<Mutex<InMemoryStoreState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    saved: Option<PersistedCatalog>,
    cached: Option<PersistedCatalog>,
    save_count: usize,
    save_failure: Option<String>,
}

impl InMemoryStoreState {
    fn hydrate(&mut self) -> &mut PersistedCatalog {
        let saved = &self.saved;
        self.cached.get_or_insert_with(|| {
            saved
                .as_ref()
                .filter(|catalog| catalog.is_current_version())
                .cloned()
                .unwrap_or_default()
        })
    }
}

impl InMemoryCatalogStore {
    /// Creates a store with nothing saved.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose backing medium already holds `catalog`.
    #[must_use]
    pub fn with_saved(catalog: PersistedCatalog) -> Self {
        let store = Self::new();
        store.lock().saved = Some(catalog);
        store
    }

    /// Returns what the last successful save wrote.
    #[must_use]
    pub fn saved(&self) -> Option<PersistedCatalog> {
        self.lock().saved.clone()
    }

    /// Returns how many saves succeeded.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Makes every subsequent save fail with `reason`, or succeed again
    /// when `None`.
    pub fn fail_saves(&self, reason: Option<&str>) {
        self.lock().save_failure = reason.map(str::to_owned);
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryStoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn load(&self) -> PersistedCatalog {
        self.lock().hydrate().clone()
    }

    fn save(&self) -> CatalogStoreResult<()> {
        let mut state = self.lock();
        let catalog = state.hydrate();
        catalog.touch(Utc::now());
        let snapshot = catalog.clone();

        if let Some(reason) = state.save_failure.clone() {
            return Err(CatalogStoreError::io(std::io::Error::other(reason)));
        }

        state.saved = Some(snapshot);
        state.save_count = state.save_count.saturating_add(1);
        Ok(())
    }

    fn invalidate(&self) {
        self.lock().cached = None;
    }

    fn modify(&self, change: Box<dyn FnOnce(&mut PersistedCatalog) + '_>) {
        change(self.lock().hydrate());
    }

    fn inspect(&self, view: Box<dyn FnOnce(&PersistedCatalog) + '_>) {
        view(self.lock().hydrate());
    }
}
