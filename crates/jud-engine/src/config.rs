//! # Engine Configuration
//!
//! Loaded from YAML. Every key is optional; missing keys take the
//! defaults below.
//!
//! ```yaml
//! lock_timeout_ms: 250
//! nurej_prefix: "LPZ"
//! holidays: ["2026-01-22", "2026-02-16", "2026-02-17"]
//! plazos:
//!   citacion: 10
//!   contestacion: 30
//! ```
//!
//! Environment overrides: `JUD_CONFIG` names the file to load and
//! `JUD_LOCK_TIMEOUT_MS` replaces `lock_timeout_ms`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jud_core::{BusinessDayCalculator, FixedHolidays};
use jud_state::{PlazoConfig, PlazoConfigError};

/// Environment variable naming the YAML configuration file.
pub const CONFIG_ENV: &str = "JUD_CONFIG";
/// Environment variable overriding the lock timeout.
pub const LOCK_TIMEOUT_ENV: &str = "JUD_LOCK_TIMEOUT_MS";

const MAX_LOCK_TIMEOUT_MS: u64 = 30_000;

/// Configuration loading or validation failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("environment variable {var} has invalid value {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error(transparent)]
    Plazo(#[from] PlazoConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Statutory plazo lengths.
    pub plazos: PlazoConfig,
    /// Bounded wait for a proceso lock before failing with `Busy`.
    pub lock_timeout_ms: u64,
    /// Court holidays on top of weekends.
    pub holidays: Vec<NaiveDate>,
    /// Prepended to generated NUREJs.
    pub nurej_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            plazos: PlazoConfig::default(),
            lock_timeout_ms: 250,
            holidays: Vec::new(),
            nurej_prefix: String::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Load from `JUD_CONFIG` (or defaults), apply `JUD_LOCK_TIMEOUT_MS`,
    /// and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(None, |var| std::env::var(var).ok())
    }

    /// Load from an explicit file if given, else from `lookup(JUD_CONFIG)`,
    /// then apply overrides from `lookup` and validate.
    pub fn resolve(
        file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let from_env = lookup(CONFIG_ENV).map(PathBuf::from);
        let config = match file.or(from_env.as_deref()) {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        let config = config.with_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(LOCK_TIMEOUT_ENV) {
            self.lock_timeout_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: LOCK_TIMEOUT_ENV,
                value,
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plazos.validate()?;
        if self.lock_timeout_ms == 0 || self.lock_timeout_ms > MAX_LOCK_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "lock_timeout_ms must be between 1 and {MAX_LOCK_TIMEOUT_MS}, got {}",
                self.lock_timeout_ms
            )));
        }
        if self.nurej_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "nurej_prefix must not contain whitespace: {:?}",
                self.nurej_prefix
            )));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Business-day calculator with the configured holidays.
    pub fn calendar(&self) -> BusinessDayCalculator {
        BusinessDayCalculator::new(FixedHolidays::new(self.holidays.iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(EngineConfig::from_yaml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_yaml_overrides_selected_keys() {
        let cfg = EngineConfig::from_yaml_str(
            "nurej_prefix: LPZ\nholidays: [2026-02-16]\nplazos:\n  contestacion: 20\n",
        )
        .unwrap();
        assert_eq!(cfg.nurej_prefix, "LPZ");
        assert_eq!(cfg.plazos.contestacion, 20);
        assert_eq!(cfg.plazos.citacion, 10);
        assert_eq!(cfg.holidays, vec![NaiveDate::from_ymd_opt(2026, 2, 16).unwrap()]);
        assert!(!cfg.calendar().is_business_day(cfg.holidays[0]));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(EngineConfig::from_yaml_str("lock_timeout: 5").is_err());
    }

    #[test]
    fn test_env_override_and_validation() {
        let cfg = EngineConfig::resolve(None, env(&[(LOCK_TIMEOUT_ENV, "900")])).unwrap();
        assert_eq!(cfg.lock_timeout(), Duration::from_millis(900));

        let err = EngineConfig::resolve(None, env(&[(LOCK_TIMEOUT_ENV, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));

        let err = EngineConfig::resolve(None, env(&[(LOCK_TIMEOUT_ENV, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_plazo_fails_validation() {
        let cfg = EngineConfig::from_yaml_str("plazos:\n  apelacion: 0\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Plazo(_))));
    }

    #[test]
    fn test_file_from_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jud.yaml");
        std::fs::write(&path, "lock_timeout_ms: 1000\n").unwrap();
        let path_str = path.to_string_lossy().to_string();
        let cfg = EngineConfig::resolve(None, env(&[(CONFIG_ENV, &path_str)])).unwrap();
        assert_eq!(cfg.lock_timeout_ms, 1000);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::from_yaml_file(Path::new("/nonexistent/jud.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
