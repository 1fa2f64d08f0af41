//! Validated name type for tool sources.

use super::ToolCacheDomainError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Maximum length for a source name.
const MAX_SOURCE_NAME_LENGTH: usize = 100;

/// Reserved source name for built-in, process-local tools.
pub const INTERNAL_SOURCE: &str = "internal";

/// Validated identifier of a tool source.
///
/// A source is either the built-in [`INTERNAL_SOURCE`] registry or an
/// external tool server keyed by its configuration name. Names are trimmed
/// but otherwise kept verbatim, since they mirror configuration keys.
///
/// Deserialisation runs the same validation as [`SourceName::new`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceName(String);

impl SourceName {
    /// Creates a validated source name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheDomainError`] when the trimmed value is empty,
    /// contains control characters, or exceeds 100 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ToolCacheDomainError> {
        let normalized = value.into().trim().to_owned();

        if normalized.is_empty() {
            return Err(ToolCacheDomainError::EmptySourceName);
        }

        if normalized.chars().any(char::is_control) {
            return Err(ToolCacheDomainError::InvalidSourceName(normalized));
        }

        if normalized.chars().count() > MAX_SOURCE_NAME_LENGTH {
            return Err(ToolCacheDomainError::SourceNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the sentinel name of the built-in tool registry.
    #[must_use]
    pub fn internal() -> Self {
        Self(INTERNAL_SOURCE.to_owned())
    }

    /// Returns whether this is the built-in tool registry.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.0 == INTERNAL_SOURCE
    }

    /// Returns the source name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SourceName {
    type Error = ToolCacheDomainError;

    fn try_from(value: String) -> Result<Self, ToolCacheDomainError> {
        Self::new(value)
    }
}

impl From<SourceName> for String {
    fn from(name: SourceName) -> Self {
        name.0
    }
}

impl AsRef<str> for SourceName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for SourceName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("github", "github")]
    #[case("  filesystem-tools ", "filesystem-tools")]
    #[case("Slack_MCP", "Slack_MCP")]
    fn source_name_is_trimmed_but_not_rewritten(#[case] input: &str, #[case] expected: &str) {
        let name = SourceName::new(input).expect("valid source name");
        assert_eq!(name.as_str(), expected);
    }

    #[rstest]
    #[case("", ToolCacheDomainError::EmptySourceName)]
    #[case("   ", ToolCacheDomainError::EmptySourceName)]
    #[case("bad\nname", ToolCacheDomainError::InvalidSourceName("bad\nname".to_owned()))]
    fn invalid_source_names_are_rejected(
        #[case] input: &str,
        #[case] expected: ToolCacheDomainError,
    ) {
        assert_eq!(SourceName::new(input), Err(expected));
    }

    #[test]
    fn over_long_source_name_is_rejected() {
        let result = SourceName::new("a".repeat(101));
        assert!(matches!(
            result,
            Err(ToolCacheDomainError::SourceNameTooLong(_))
        ));
    }

    #[rstest]
    #[case("\"\"")]
    #[case("\"   \"")]
    #[case("\"bad\\u0007name\"")]
    fn deserialisation_validates_names(#[case] raw: &str) {
        assert!(serde_json::from_str::<SourceName>(raw).is_err());
    }

    #[test]
    fn deserialisation_trims_like_new() {
        let name: SourceName = serde_json::from_str("\" alpha \"").expect("valid source name");
        assert_eq!(name.as_str(), "alpha");
        assert_eq!(
            serde_json::to_string(&name).expect("serialisable"),
            "\"alpha\""
        );
    }

    #[test]
    fn internal_sentinel_is_recognised() {
        assert!(SourceName::internal().is_internal());
        let external = SourceName::new("alpha").expect("valid source name");
        assert!(!external.is_internal());
    }
}
