//! Configuration management for redwindow.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, WindowError};
use crate::ratelimit::LimitConfig;
use crate::store::StoreOptions;

/// Prefix for environment overrides, e.g. `REDWINDOW__REDIS__URL`.
const ENV_PREFIX: &str = "REDWINDOW";

/// Main configuration for redwindow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedwindowConfig {
    /// Redis connection configuration
    #[serde(default)]
    pub redis: RedisConfig,

    /// Limiter configuration
    #[serde(default)]
    pub limiter: LimiterSettings,
}

/// Redis connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

/// Fixed-window limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterSettings {
    /// Points allowed per window
    #[serde(default = "default_points")]
    pub points: u64,

    /// Window length in seconds; 0 means no expiry
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    /// Prefix prepended to subject keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Replacement Lua body for the increment procedure
    #[serde(default)]
    pub increment_script: Option<String>,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            points: default_points(),
            duration_secs: default_duration_secs(),
            key_prefix: default_key_prefix(),
            increment_script: None,
        }
    }
}

fn default_points() -> u64 {
    4
}

fn default_duration_secs() -> u64 {
    1
}

fn default_key_prefix() -> String {
    "rlflx".to_string()
}

impl LimiterSettings {
    /// Build the full store key for a subject.
    pub fn key(&self, subject: &str) -> String {
        if self.key_prefix.is_empty() {
            subject.to_string()
        } else {
            format!("{}:{}", self.key_prefix, subject)
        }
    }

    /// Limit configuration for a [`crate::ratelimit::FixedWindowLimiter`].
    pub fn limit_config(&self) -> LimitConfig {
        LimitConfig {
            limit: self.points,
            window: Duration::from_secs(self.duration_secs),
        }
    }

    /// Options for a [`crate::store::RedisStore`].
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            points: self.points,
            duration_secs: self.duration_secs,
            increment_script: self.increment_script.clone(),
        }
    }
}

impl RedwindowConfig {
    /// Load configuration from a YAML file, with `REDWINDOW__*` environment
    /// variables taking precedence.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).format(::config::FileFormat::Yaml))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| WindowError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| WindowError::Config(e.to_string()))
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| WindowError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RedwindowConfig::default();

        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(config.limiter.points, 4);
        assert_eq!(config.limiter.duration_secs, 1);
        assert_eq!(config.limiter.key_prefix, "rlflx");
        assert!(config.limiter.increment_script.is_none());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
redis:
  url: redis://cache:6380/2
limiter:
  points: 5
  duration_secs: 60
  key_prefix: login
"#;
        let config = RedwindowConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.redis.url, "redis://cache:6380/2");
        assert_eq!(config.limiter.points, 5);
        assert_eq!(config.limiter.key("10.0.0.1"), "login:10.0.0.1");

        let limit = config.limiter.limit_config();
        assert_eq!(limit.limit, 5);
        assert_eq!(limit.window, Duration::from_secs(60));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = RedwindowConfig::from_yaml("limiter:\n  points: 10\n").unwrap();

        assert_eq!(config.limiter.points, 10);
        assert_eq!(config.limiter.duration_secs, 1);
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
    }

    #[test]
    fn test_store_options_carry_script() {
        let yaml = r#"
limiter:
  increment_script: "return {1, 1000}"
"#;
        let config = RedwindowConfig::from_yaml(yaml).unwrap();
        let options = config.limiter.store_options();

        assert_eq!(options.increment_script.as_deref(), Some("return {1, 1000}"));
        assert_eq!(options.points, 4);
    }

    #[test]
    fn test_empty_prefix() {
        let settings = LimiterSettings {
            key_prefix: String::new(),
            ..Default::default()
        };
        assert_eq!(settings.key("user"), "user");
    }

    #[test]
    fn test_invalid_yaml() {
        let result = RedwindowConfig::from_yaml("limiter: [");
        assert!(matches!(result, Err(WindowError::Config(_))));
    }
}
