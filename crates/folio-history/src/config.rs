//! History configuration, loaded from RON.
//!
//! ```ron
//! (
//!     retention: (max_versions: Some(200)),
//!     branch_policy: Prune,
//!     cursor_prefix: "cursor:",
//! )
//! ```
//!
//! Every field is optional; a missing file means defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::RetentionPolicy;

/// What an edit made after undo does to the versions newer than the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchPolicy {
    /// Delete them; the edit continues from the cursor (classic editor redo).
    #[default]
    Prune,
    /// Keep them; the edit is diffed against the newest text and appended.
    Append,
}

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub retention: RetentionPolicy,
    pub branch_policy: BranchPolicy,
    /// Prefix of cursor keys in the cursor store (`<prefix><document id>`).
    pub cursor_prefix: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::default(),
            branch_policy: BranchPolicy::default(),
            cursor_prefix: "cursor:".to_string(),
        }
    }
}

impl HistoryConfig {
    /// Default location: `<config dir>/folio/history.ron`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("history.ron")
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Like [`HistoryConfig::load`], but a missing file yields defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => Self::from_ron_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.as_ref().display(), "no history config, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_branch_policy(mut self, branch_policy: BranchPolicy) -> Self {
        self.branch_policy = branch_policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = HistoryConfig::from_ron_str("(branch_policy: Append)").unwrap();
        assert_eq!(config.branch_policy, BranchPolicy::Append);
        assert_eq!(config.retention, RetentionPolicy::keep_latest(100));
        assert_eq!(config.cursor_prefix, "cursor:");
    }

    #[test]
    fn test_round_trip_through_ron() {
        let config = HistoryConfig::default()
            .with_retention(RetentionPolicy::unbounded())
            .with_branch_policy(BranchPolicy::Append);
        let text = config.to_ron_string().unwrap();
        assert_eq!(HistoryConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = HistoryConfig::load_or_default(dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, HistoryConfig::default());

        let err = HistoryConfig::load(dir.path().join("absent.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_rejects_bad_ron() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.ron");
        std::fs::write(&path, "(retention: oops").unwrap();
        assert!(matches!(HistoryConfig::load(&path), Err(ConfigError::Ron(_))));
    }
}
