//! Engine configuration.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - A synced session always names an account.

use crate::repo::snapshot_cache::DEFAULT_CACHE_NAMESPACE;
use crate::store::undo::UNDO_WINDOW_MS;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Identity handed over by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountContext {
    pub account_id: String,
    /// `false` for local-only (guest) sessions; no sync worker is started.
    pub synced: bool,
}

impl Default for AccountContext {
    fn default() -> Self {
        Self {
            account_id: "local".to_string(),
            synced: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub account: AccountContext,
    /// SQLite cache file; `None` keeps the cache in memory.
    pub cache_path: Option<PathBuf>,
    pub cache_namespace: String,
    pub undo_window_ms: i64,
    /// Falls back to `logging::default_log_level()`.
    pub log_level: Option<String>,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            account: AccountContext::default(),
            cache_path: None,
            cache_namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            undo_window_ms: UNDO_WINDOW_MS,
            log_level: None,
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "config is not valid JSON: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.synced && self.account.account_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "synced sessions require an account_id".to_string(),
            ));
        }
        if self.cache_namespace.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "cache_namespace must not be blank".to_string(),
            ));
        }
        if self.undo_window_ms < 0 {
            return Err(ConfigError::Invalid(format!(
                "undo_window_ms must be >= 0, got {}",
                self.undo_window_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use std::io::Write;

    #[test]
    fn empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.undo_window_ms, 7_000);
        assert_eq!(config.cache_namespace, "plansync.snapshot.v1");
        assert!(!config.account.synced);
    }

    #[test]
    fn partial_config_merges_with_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"account":{"account_id":"u-1","synced":true},"undo_window_ms":3000}"#,
        )
        .unwrap();
        assert_eq!(config.account.account_id, "u-1");
        assert!(config.account.synced);
        assert_eq!(config.undo_window_ms, 3_000);
        assert!(config.cache_path.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"account":{"account_id":" ","synced":true}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"undo_window_ms":-1}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("[1,2]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn reads_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cache_namespace":"custom.ns"}}"#).unwrap();
        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.cache_namespace, "custom.ns");

        let missing = EngineConfig::from_json_file("/definitely/not/here.json");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
