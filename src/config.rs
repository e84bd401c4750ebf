use serde::Deserialize;
use std::path::Path;
use validator::{Validate, ValidationError};

use crate::error::LimitsResult;

/// Process configuration, read from a TOML file.
///
/// ```toml
/// [redis]
/// url = "redis://127.0.0.1:6379"
///
/// [rs_limits]
/// groups = "=0.1,Admin=0.5,Delinquent=1.0"
///
/// [logging]
/// level = "info"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub redis: RedisSettings,

    pub rs_limits: RsLimitsSettings,

    #[validate(nested)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct RedisSettings {
    /// Redis connection URL
    #[validate(custom(function = "validate_redis_url"))]
    pub url: String,
}

/// The `[rs_limits]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RsLimitsSettings {
    /// Group priorities, e.g. `=0.1,Admin=0.5,Delinquent=1.0`
    pub groups: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSettings {
    #[validate(length(min = 1))]
    pub level: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> LimitsResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text without consulting the environment
    pub fn from_toml(contents: &str) -> LimitsResult<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// The raw group priorities string (`rs_limits.groups`)
    pub fn group_priorities(&self) -> &str {
        &self.rs_limits.groups
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.redis.url = url;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

fn validate_redis_url(url: &str) -> Result<(), ValidationError> {
    if url.starts_with("redis://") || url.starts_with("rediss://") {
        Ok(())
    } else {
        let mut err = ValidationError::new("redis_url");
        err.message = Some("Redis URL must start with 'redis://' or 'rediss://'".into());
        Err(err)
    }
}
