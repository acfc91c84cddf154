//! Core runtime configuration.
//!
//! # Responsibility
//! - Carry tunables for storage, logging, document defaults and thumbnails.
//! - Load from JSON with per-field defaults and validate before use.
//!
//! # Invariants
//! - A validated config has a non-blank default title.
//! - `list_default_limit` is non-zero and never exceeds `list_max_limit`.

use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_THUMBNAIL_BUDGET_MS: u64 = 2_000;
const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 100;

/// Errors from config loading and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// Input is not valid JSON for the config shape.
    Parse(serde_json::Error),
    /// A field holds a value outside its contract.
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid config `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub log_dir: Option<PathBuf>,
    /// SQLite file path. `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    /// Title assigned to documents created with a blank title
    /// (e.g. `"Untitled"`, `"Sem título"`).
    pub default_title: String,
    /// Thumbnails slower than this are discarded.
    pub thumbnail_budget_ms: u64,
    pub list_default_limit: u32,
    pub list_max_limit: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
            default_title: DEFAULT_TITLE.to_string(),
            thumbnail_budget_ms: DEFAULT_THUMBNAIL_BUDGET_MS,
            list_default_limit: DEFAULT_LIST_LIMIT,
            list_max_limit: MAX_LIST_LIMIT,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config. Missing fields take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field contracts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(|message| ConfigError::Invalid {
            field: "log_level",
            message,
        })?;
        if self.default_title.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_title",
                message: "must not be blank".to_string(),
            });
        }
        if self.list_default_limit == 0 || self.list_max_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "list_default_limit",
                message: "list limits must be positive".to_string(),
            });
        }
        if self.list_default_limit > self.list_max_limit {
            return Err(ConfigError::Invalid {
                field: "list_default_limit",
                message: format!(
                    "default {} exceeds max {}",
                    self.list_default_limit, self.list_max_limit
                ),
            });
        }
        if let Some(dir) = self.log_dir.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "log_dir",
                    message: format!("must be absolute, got `{}`", dir.display()),
                });
            }
        }
        Ok(())
    }

    pub fn thumbnail_budget(&self) -> Duration {
        Duration::from_millis(self.thumbnail_budget_ms)
    }

    /// Applies the list limit contract: `None`/`0` → default, clamp to max.
    pub fn normalize_limit(&self, limit: Option<u32>) -> u32 {
        match limit {
            None | Some(0) => self.list_default_limit,
            Some(value) => value.min(self.list_max_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};

    #[test]
    fn empty_json_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.default_title, "Untitled");
    }

    #[test]
    fn localized_default_title_is_accepted() {
        let config = CoreConfig::from_json_str(r#"{"default_title":"Sem título"}"#).unwrap();
        assert_eq!(config.default_title, "Sem título");
    }

    #[test]
    fn blank_title_and_bad_limits_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{"default_title":"  "}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "default_title", .. }));

        let err =
            CoreConfig::from_json_str(r#"{"list_default_limit":50,"list_max_limit":10}"#)
                .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "list_default_limit", .. }));
    }

    #[test]
    fn unknown_fields_and_levels_are_rejected() {
        assert!(matches!(
            CoreConfig::from_json_str(r#"{"colour":"blue"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(CoreConfig::from_json_str(r#"{"log_level":"loud"}"#).is_err());
        assert!(CoreConfig::from_json_str(r#"{"log_dir":"relative/logs"}"#).is_err());
    }

    #[test]
    fn normalize_limit_defaults_and_clamps() {
        let config = CoreConfig::default();
        assert_eq!(config.normalize_limit(None), 20);
        assert_eq!(config.normalize_limit(Some(0)), 20);
        assert_eq!(config.normalize_limit(Some(7)), 7);
        assert_eq!(config.normalize_limit(Some(500)), 100);
    }
}
