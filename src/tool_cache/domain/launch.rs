//! Launch definition of an external tool source.

use super::ToolCacheDomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How an external tool source is started: command, arguments, environment.
///
/// The environment is kept in key order so that two definitions with the
/// same variables compare and fingerprint equal regardless of how they were
/// assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLaunchSpec {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
}

impl SourceLaunchSpec {
    /// Creates a launch definition for `command`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCacheDomainError::EmptyLaunchCommand`] when `command`
    /// is empty after trimming.
    pub fn new(command: impl Into<String>) -> Result<Self, ToolCacheDomainError> {
        let normalized_command = command.into().trim().to_owned();
        if normalized_command.is_empty() {
            return Err(ToolCacheDomainError::EmptyLaunchCommand);
        }

        Ok(Self {
            command: normalized_command,
            args: Vec::new(),
            env: BTreeMap::new(),
        })
    }

    /// Replaces command-line arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = values.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces process environment variables.
    #[must_use]
    pub fn with_env<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = values
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    /// Returns the executable command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns command-line arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns environment variables.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}
