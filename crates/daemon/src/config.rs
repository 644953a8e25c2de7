use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use steward_election::ElectionConfig;
use steward_lease_redis::RedisConfig;

/// Errors raised while loading the daemon configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("lease key {0} is configured more than once")]
    DuplicateKey(String),
}

/// Top-level configuration for the Steward daemon, loaded from a TOML file.
///
/// # Example
///
/// ```toml
/// shutdown_timeout_ms = 10000
///
/// [redis]
/// url = "redis://127.0.0.1:6379"
/// prefix = "steward"
///
/// [[elections]]
/// key = "leader:job-sweeper"
/// ttl_ms = 15000
///
/// [[elections]]
/// key = "leader:report-mailer"
/// ttl_ms = 5000
/// tick_interval_ms = 1000
/// operation_timeout_ms = 500
/// ```
#[derive(Debug, Deserialize)]
pub struct StewardConfig {
    /// Redis connection configuration.
    #[serde(default)]
    pub redis: RedisConfig,
    /// Upper bound on stopping every engine at shutdown.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Elections this instance takes part in.
    #[serde(default)]
    pub elections: Vec<ElectionEntry>,
}

/// One contested key.
#[derive(Debug, Clone, Deserialize)]
pub struct ElectionEntry {
    /// The lease key.
    pub key: String,
    /// Lease lifetime in milliseconds.
    pub ttl_ms: u64,
    /// Tick interval in milliseconds. Derived from the TTL when omitted.
    pub tick_interval_ms: Option<u64>,
    /// Store operation timeout in milliseconds. Defaults to the tick interval.
    pub operation_timeout_ms: Option<u64>,
    /// Fixed leader token. A fresh one is generated when omitted.
    pub token: Option<String>,
}

fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

impl StewardConfig {
    /// Load configuration from `path`, or use defaults if the file does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names the
    /// same key twice.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = if Path::new(path).exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or names the same key twice.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        let mut seen = HashSet::new();
        for entry in &config.elections {
            if !seen.insert(entry.key.as_str()) {
                return Err(ConfigError::DuplicateKey(entry.key.clone()));
            }
        }
        Ok(config)
    }

    /// Upper bound on stopping every engine at shutdown.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl ElectionEntry {
    /// Convert into an engine configuration. Validation happens when the
    /// engine is built.
    pub fn to_election_config(&self) -> ElectionConfig {
        let mut config =
            ElectionConfig::new(self.key.as_str(), Duration::from_millis(self.ttl_ms));
        if let Some(ms) = self.tick_interval_ms {
            config = config.with_tick_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = self.operation_timeout_ms {
            config = config.with_operation_timeout(Duration::from_millis(ms));
        }
        if let Some(token) = &self.token {
            config = config.with_token(token.as_str());
        }
        config
    }
}
