//! The durable tool catalog written to the cache file.

use super::{SourceFingerprint, SourceName, SourceStatus, SourceStatusTracker, ToolEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// On-disk format version. Bump whenever the serialised shape changes.
pub const CATALOG_FORMAT_VERSION: u32 = 1;

/// Full tool catalog plus per-source fingerprints and statuses.
///
/// The catalog is always written as a whole; there is no incremental
/// on-disk update. Mutators keep the three per-source views in step: a
/// source's entries, fingerprint and status are replaced or dropped
/// together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCatalog {
    version: u32,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    tools: Vec<ToolEntry>,
    #[serde(default, rename = "serverChecksums")]
    fingerprints: BTreeMap<SourceName, SourceFingerprint>,
    #[serde(default, rename = "serverStatuses")]
    statuses: SourceStatusTracker,
}

impl Default for PersistedCatalog {
    fn default() -> Self {
        Self::empty()
    }
}

impl PersistedCatalog {
    /// Creates an empty catalog at the current format version.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: CATALOG_FORMAT_VERSION,
            last_updated: None,
            tools: Vec::new(),
            fingerprints: BTreeMap::new(),
            statuses: SourceStatusTracker::new(),
        }
    }

    /// Returns the format version this catalog was read with.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns whether this catalog uses the current format version.
    #[must_use]
    pub const fn is_current_version(&self) -> bool {
        self.version == CATALOG_FORMAT_VERSION
    }

    /// Returns when the catalog was last saved.
    #[must_use]
    pub const fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Returns every cached tool entry.
    #[must_use]
    pub fn tools(&self) -> &[ToolEntry] {
        &self.tools
    }

    /// Returns whether the catalog holds at least one tool entry.
    #[must_use]
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Returns the cached entries of one source.
    #[must_use]
    pub fn tools_for(&self, source: &SourceName) -> Vec<ToolEntry> {
        self.tools
            .iter()
            .filter(|entry| entry.belongs_to(source))
            .cloned()
            .collect()
    }

    /// Returns every recorded fingerprint.
    #[must_use]
    pub const fn fingerprints(&self) -> &BTreeMap<SourceName, SourceFingerprint> {
        &self.fingerprints
    }

    /// Returns the fingerprint recorded for `source`.
    #[must_use]
    pub fn fingerprint(&self, source: &SourceName) -> Option<&SourceFingerprint> {
        self.fingerprints.get(source)
    }

    /// Returns the status tracker.
    #[must_use]
    pub const fn statuses(&self) -> &SourceStatusTracker {
        &self.statuses
    }

    /// Returns every source the catalog knows anything about.
    #[must_use]
    pub fn known_sources(&self) -> BTreeSet<SourceName> {
        self.fingerprints
            .keys()
            .chain(self.statuses.names())
            .chain(self.tools.iter().map(ToolEntry::source))
            .cloned()
            .collect()
    }

    /// Replaces every entry of `source` and records its fingerprint.
    ///
    /// Entries are re-attributed to `source` so the tool list always agrees
    /// with the fingerprint key.
    pub fn add_source_tools(
        &mut self,
        source: &SourceName,
        tools: impl IntoIterator<Item = ToolEntry>,
        fingerprint: SourceFingerprint,
    ) {
        self.tools.retain(|entry| !entry.belongs_to(source));
        self.tools.extend(
            tools
                .into_iter()
                .map(|entry| entry.with_source(source.clone())),
        );
        self.fingerprints.insert(source.clone(), fingerprint);
    }

    /// Drops the entries, fingerprint and status of `source`.
    pub fn remove_source(&mut self, source: &SourceName) {
        self.tools.retain(|entry| !entry.belongs_to(source));
        self.fingerprints.remove(source);
        self.statuses.remove(source);
    }

    /// Stores a status record.
    pub fn update_status(&mut self, status: SourceStatus) {
        self.statuses.update(status);
    }

    /// Stamps the catalog as saved at `at`.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }
}
