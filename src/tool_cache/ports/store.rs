//! Persistence port for the durable tool catalog.

use crate::tool_cache::domain::{
    PersistedCatalog, SourceFingerprint, SourceName, SourceStatus, ToolEntry,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for catalog store operations.
pub type CatalogStoreResult<T> = Result<T, CatalogStoreError>;

/// Durable home of the [`PersistedCatalog`].
///
/// Stores keep a process-local copy of the catalog. Mutators only touch that
/// copy; durability needs an explicit [`CatalogStore::save`]. Methods are
/// synchronous so they can be called while the orchestrator holds its lock;
/// only `load` and `save` may touch the backing medium.
pub trait CatalogStore: Send + Sync {
    /// Returns the catalog, reading the backing medium on first use.
    ///
    /// A missing, unreadable, malformed, or wrong-version backing file
    /// yields [`PersistedCatalog::empty`]; this never fails.
    fn load(&self) -> PersistedCatalog;

    /// Stamps the process-local catalog and overwrites the backing medium.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogStoreError`] when serialisation or writing fails.
    /// The process-local copy is kept either way.
    fn save(&self) -> CatalogStoreResult<()>;

    /// Drops the process-local copy so the next `load` re-reads.
    fn invalidate(&self);

    /// Applies `change` to the process-local catalog.
    fn modify(&self, change: Box<dyn FnOnce(&mut PersistedCatalog) + '_>);

    /// Lends the process-local catalog to `view` without copying it.
    fn inspect(&self, view: Box<dyn FnOnce(&PersistedCatalog) + '_>);

    /// Replaces every entry of `source` and records its fingerprint.
    fn add_source_tools(
        &self,
        source: &SourceName,
        tools: Vec<ToolEntry>,
        fingerprint: SourceFingerprint,
    ) {
        self.modify(Box::new(move |catalog| {
            catalog.add_source_tools(source, tools, fingerprint);
        }));
    }

    /// Drops the entries, fingerprint and status of `source`.
    fn remove_source(&self, source: &SourceName) {
        self.modify(Box::new(move |catalog| catalog.remove_source(source)));
    }

    /// Stores a status record.
    fn update_status(&self, status: SourceStatus) {
        self.modify(Box::new(move |catalog| catalog.update_status(status)));
    }

    /// Returns a copy of every status record.
    fn statuses(&self) -> BTreeMap<SourceName, SourceStatus> {
        let mut statuses = BTreeMap::new();
        self.inspect(Box::new(|catalog| statuses = catalog.statuses().all()));
        statuses
    }

    /// Returns a copy of every recorded fingerprint.
    fn fingerprints(&self) -> BTreeMap<SourceName, SourceFingerprint> {
        let mut fingerprints = BTreeMap::new();
        self.inspect(Box::new(|catalog| {
            fingerprints.clone_from(catalog.fingerprints());
        }));
        fingerprints
    }
}

/// Errors returned by catalog store implementations.
#[derive(Debug, Clone, Error)]
pub enum CatalogStoreError {
    /// The catalog could not be encoded.
    #[error("failed to serialise tool catalog: {0}")]
    Serialization(Arc<dyn std::error::Error + Send + Sync>),

    /// The backing medium could not be written.
    #[error("failed to write tool catalog: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl CatalogStoreError {
    /// Wraps an encoding failure.
    pub fn serialization(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Serialization(Arc::new(err))
    }

    /// Wraps a write failure.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
