//! Tool entry value object.

use super::{SourceName, ToolCacheDomainError};
use serde::{Deserialize, Serialize};

/// A callable tool as advertised by one source.
///
/// Name uniqueness is scoped to the source: two sources may both expose a
/// tool called `search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolEntry {
    name: String,
    description: String,
    source: SourceName,
}

impl ToolEntry {
    /// Creates a tool entry.
    ///
    /// The description may be empty; many tool servers omit it.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheDomainError::EmptyToolName`] when the name is
    /// empty after trimming.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        source: SourceName,
    ) -> Result<Self, ToolCacheDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(ToolCacheDomainError::EmptyToolName);
        }

        Ok(Self {
            name: normalized_name,
            description: description.into().trim().to_owned(),
            source,
        })
    }

    /// Creates an entry for a built-in tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheDomainError::EmptyToolName`] when the name is
    /// empty after trimming.
    pub fn internal(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ToolCacheDomainError> {
        Self::new(name, description, SourceName::internal())
    }

    /// Returns the entry re-attributed to `source`.
    #[must_use]
    pub fn with_source(mut self, source: SourceName) -> Self {
        self.source = source;
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the source that exposes this tool.
    #[must_use]
    pub const fn source(&self) -> &SourceName {
        &self.source
    }

    /// Returns whether this entry belongs to `source`.
    #[must_use]
    pub fn belongs_to(&self, source: &SourceName) -> bool {
        self.source == *source
    }
}
