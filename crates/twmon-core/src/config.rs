//! Runtime configuration.
//!
//! Settings come from an optional JSON file, then environment variables
//! (a `.env` file in the working directory is honoured). Every field has a
//! default so partial files and older files keep loading.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators::IndicatorConfig;

pub const ENV_CONFIG_PATH: &str = "TWMON_CONFIG";
pub const ENV_FINMIND_TOKEN: &str = "FINMIND_TOKEN";
pub const ENV_REQUEST_DELAY_MS: &str = "TWMON_REQUEST_DELAY_MS";
pub const ENV_CACHE_TTL_SECS: &str = "TWMON_CACHE_TTL_SECS";
pub const ENV_TIMEOUT_MS: &str = "TWMON_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("environment variable {name} must be an unsigned integer, got '{value}'")]
    InvalidEnv { name: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_request_delay_ms() -> u64 {
    1_000
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_history_days() -> usize {
    60
}

fn default_flow_lookback_days() -> u32 {
    7
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Fixed delay between successive upstream requests.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Lifetime of memoized upstream responses; zero disables the cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Trading days of history requested per instrument.
    #[serde(default = "default_history_days")]
    pub history_days: usize,
    /// Calendar days searched for the latest broker flow date.
    #[serde(default = "default_flow_lookback_days")]
    pub flow_lookback_days: u32,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    /// Never written back to disk.
    #[serde(default, skip_serializing)]
    pub finmind_token: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            timeout_ms: default_timeout_ms(),
            history_days: default_history_days(),
            flow_lookback_days: default_flow_lookback_days(),
            indicators: IndicatorConfig::default(),
            finmind_token: None,
        }
    }
}

impl MonitorConfig {
    /// Loads `path` (or `$TWMON_CONFIG`) when given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();

        let env_path = std::env::var(ENV_CONFIG_PATH).ok();
        let path = path.or_else(|| env_path.as_deref().map(Path::new));

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_FINMIND_TOKEN).filter(|token| !token.trim().is_empty()) {
            self.finmind_token = Some(token);
        }
        if let Some(value) = parse_env(&lookup, ENV_REQUEST_DELAY_MS)? {
            self.request_delay_ms = value;
        }
        if let Some(value) = parse_env(&lookup, ENV_CACHE_TTL_SECS)? {
            self.cache_ttl_secs = value;
        }
        if let Some(value) = parse_env(&lookup, ENV_TIMEOUT_MS)? {
            self.timeout_ms = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let indicators = &self.indicators;
        if indicators
            .volume_windows
            .iter()
            .chain(indicators.close_windows.iter())
            .any(|window| *window == 0)
        {
            return Err(ConfigError::Invalid(String::from(
                "indicator windows must be greater than zero",
            )));
        }

        let (short, long) = indicators.suggested_windows;
        if short == 0 || short >= long {
            return Err(ConfigError::Invalid(format!(
                "suggested price windows must satisfy 0 < short < long, got ({short}, {long})"
            )));
        }

        if indicators.lot_size == 0 {
            return Err(ConfigError::Invalid(String::from("lot_size must be greater than zero")));
        }

        if self.history_days < indicators.longest_window() {
            return Err(ConfigError::Invalid(format!(
                "history_days ({}) is shorter than the longest indicator window ({})",
                self.history_days,
                indicators.longest_window()
            )));
        }

        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse_env<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::default();
        config.validate().expect("defaults must validate");
        assert_eq!(config.request_delay(), Duration::from_secs(1));
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = MonitorConfig::default();
        config
            .apply_env(|name| match name {
                ENV_FINMIND_TOKEN => Some(String::from("secret")),
                ENV_REQUEST_DELAY_MS => Some(String::from("250")),
                _ => None,
            })
            .expect("overrides apply");

        assert_eq!(config.finmind_token.as_deref(), Some("secret"));
        assert_eq!(config.request_delay_ms, 250);
        assert_eq!(config.cache_ttl_secs, 600);
    }

    #[test]
    fn malformed_env_value_is_reported() {
        let mut config = MonitorConfig::default();
        let err = config
            .apply_env(|name| (name == ENV_CACHE_TTL_SECS).then(|| String::from("ten")))
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::InvalidEnv { name: ENV_CACHE_TTL_SECS, .. }));
    }

    #[test]
    fn rejects_inverted_suggested_windows() {
        let mut config = MonitorConfig::default();
        config.indicators.suggested_windows = (20, 10);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn token_is_not_serialized() {
        let config = MonitorConfig {
            finmind_token: Some(String::from("secret")),
            ..MonitorConfig::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(!json.contains("secret"));
    }
}
