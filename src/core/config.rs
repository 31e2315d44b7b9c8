//! Configuration parsing and validation.
//!
//! Client configuration is loaded from TOML files with programmatic overrides.
//! Only the `[redis]` section is required; everything else has defaults.

use crate::serializer::SerializerKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Redis connection settings.
    pub redis: RedisConfig,

    /// Collection defaults.
    #[serde(default)]
    pub collections: CollectionsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Server address (e.g., "127.0.0.1:6379").
    pub address: String,

    /// Logical database selected after connecting.
    #[serde(default)]
    pub database: Option<u32>,

    /// ACL username (Redis 6+). Requires `password`.
    #[serde(default)]
    pub username: Option<String>,

    /// Password sent with AUTH after connecting.
    #[serde(default)]
    pub password: Option<String>,

    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-request read/write timeout in milliseconds.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

impl RedisConfig {
    /// Create settings for an address with default timeouts.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            database: None,
            username: None,
            password: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }

    /// Connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// I/O timeout as a Duration.
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

/// Collection defaults applied by the factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    /// COUNT hint passed to HSCAN during enumeration.
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,

    /// Serializer used for dictionary keys.
    #[serde(default)]
    pub key_serializer: SerializerKind,

    /// Serializer used for dictionary values.
    #[serde(default)]
    pub value_serializer: SerializerKind,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            scan_batch_size: default_scan_batch_size(),
            key_serializer: SerializerKind::default(),
            value_serializer: SerializerKind::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_io_timeout_ms() -> u64 {
    5_000
}

pub(crate) fn default_scan_batch_size() -> usize {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ClientConfig {
    /// Create a configuration for an address with all defaults.
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            redis: RedisConfig::new(address),
            collections: CollectionsConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: ClientConfig =
            toml::from_str(&content).with_context(|| "failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ClientConfig =
            toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref address) = overrides.address {
            self.redis.address = address.clone();
        }
        if let Some(database) = overrides.database {
            self.redis.database = Some(database);
        }
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(scan_batch_size) = overrides.scan_batch_size {
            self.collections.scan_batch_size = scan_batch_size;
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_redis()?;
        self.validate_collections()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_redis(&self) -> Result<()> {
        if self.redis.address.trim().is_empty() {
            anyhow::bail!("redis.address must not be empty");
        }
        if self.redis.connect_timeout_ms == 0 {
            anyhow::bail!("redis.connect_timeout_ms must be > 0");
        }
        if self.redis.io_timeout_ms == 0 {
            anyhow::bail!("redis.io_timeout_ms must be > 0");
        }
        if self.redis.username.is_some() && self.redis.password.is_none() {
            anyhow::bail!("redis.password required when redis.username is set");
        }
        Ok(())
    }

    fn validate_collections(&self) -> Result<()> {
        if self.collections.scan_batch_size == 0 {
            anyhow::bail!("collections.scan_batch_size must be > 0");
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

/// Override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override server address.
    pub address: Option<String>,
    /// Override logical database.
    pub database: Option<u32>,
    /// Override log level.
    pub log_level: Option<String>,
    /// Override HSCAN batch hint.
    pub scan_batch_size: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = ClientConfig::from_toml(
            r#"
[redis]
address = "127.0.0.1:6379"
"#,
        )
        .unwrap();

        assert_eq!(config.redis.connect_timeout_ms, 5_000);
        assert_eq!(config.redis.io_timeout(), Duration::from_secs(5));
        assert_eq!(config.collections.scan_batch_size, 250);
        assert_eq!(config.collections.key_serializer, SerializerKind::Json);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_serializer_kinds_parse() {
        let config = ClientConfig::from_toml(
            r#"
[redis]
address = "cache:6379"

[collections]
key_serializer = "json"
value_serializer = "postcard"
"#,
        )
        .unwrap();

        assert_eq!(config.collections.value_serializer, SerializerKind::Postcard);
    }

    #[test]
    fn test_username_requires_password() {
        let result = ClientConfig::from_toml(
            r#"
[redis]
address = "127.0.0.1:6379"
username = "app"
"#,
        );
        assert!(result.unwrap_err().to_string().contains("password"));
    }

    #[test]
    fn test_overrides() {
        let mut config = ClientConfig::for_address("127.0.0.1:6379");
        config.apply_overrides(&ConfigOverrides {
            address: Some("10.0.0.5:6380".to_string()),
            database: Some(3),
            log_level: Some("debug".to_string()),
            scan_batch_size: Some(10),
        });

        assert_eq!(config.redis.address, "10.0.0.5:6380");
        assert_eq!(config.redis.database, Some(3));
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.collections.scan_batch_size, 10);
        assert!(config.validate().is_ok());
    }
}
