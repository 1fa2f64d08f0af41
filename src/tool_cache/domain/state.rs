//! In-memory tool snapshot and its lifecycle phase.

use super::{SourceName, ToolEntry};
use std::fmt;

/// Observable phase of the in-memory cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachePhase {
    /// No load attempt has completed yet.
    Empty,
    /// A refresh is in flight.
    Loading,
    /// A snapshot is being served, possibly stale.
    Ready,
}

impl CachePhase {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loading => "loading",
            Self::Ready => "ready",
        }
    }
}

impl fmt::Display for CachePhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Tool snapshot plus the loaded/loading flags guarding it.
///
/// `tools == None` means no attempt has completed; `Some(vec![])` means an
/// attempt completed and found nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    tools: Option<Vec<ToolEntry>>,
    loading: bool,
}

impl CacheSnapshot {
    /// Creates an empty, never-loaded snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> CachePhase {
        if self.loading {
            CachePhase::Loading
        } else if self.tools.is_some() {
            CachePhase::Ready
        } else {
            CachePhase::Empty
        }
    }

    /// Returns whether a load attempt has completed.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.tools.is_some()
    }

    /// Returns whether a refresh is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Claims the loading flag. Returns `false` when it is already held.
    pub const fn try_begin_loading(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// Releases the loading flag.
    pub const fn finish_loading(&mut self) {
        self.loading = false;
    }

    /// Returns a copy of the served tools, or `None` before the first load.
    #[must_use]
    pub fn tools(&self) -> Option<Vec<ToolEntry>> {
        self.tools.clone()
    }

    /// Returns a copy of the entries belonging to `source`.
    #[must_use]
    pub fn tools_for(&self, source: &SourceName) -> Vec<ToolEntry> {
        self.tools
            .iter()
            .flatten()
            .filter(|entry| entry.belongs_to(source))
            .cloned()
            .collect()
    }

    /// Swaps in a complete new snapshot.
    pub fn replace(&mut self, tools: Vec<ToolEntry>) {
        self.tools = Some(tools);
    }

    /// Appends the entries of `source`, dropping any it already had.
    ///
    /// Does nothing before the first load; the next load picks the source
    /// up from persistence instead. Returns whether the snapshot changed.
    pub fn append_source(
        &mut self,
        source: &SourceName,
        entries: impl IntoIterator<Item = ToolEntry>,
    ) -> bool {
        let Some(tools) = self.tools.as_mut() else {
            return false;
        };
        tools.retain(|entry| !entry.belongs_to(source));
        tools.extend(
            entries
                .into_iter()
                .map(|entry| entry.with_source(source.clone())),
        );
        true
    }

    /// Drops every entry of `source`. Returns how many were removed.
    pub fn remove_source(&mut self, source: &SourceName) -> usize {
        let Some(tools) = self.tools.as_mut() else {
            return 0;
        };
        let before = tools.len();
        tools.retain(|entry| !entry.belongs_to(source));
        before.saturating_sub(tools.len())
    }

    /// Forgets the snapshot, returning to the never-loaded state.
    pub fn clear(&mut self) {
        self.tools = None;
    }
}
