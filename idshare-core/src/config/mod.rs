//! Configuration management for idshare
//!
//! Defaults, optionally overlaid by a TOML file, then by environment variables,
//! then validated. The API binary applies its command-line flags last.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Prefix for environment overrides: IDSHARE_<SECTION>_<KEY>
pub const ENV_PREFIX: &str = "IDSHARE";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub store: StoreConfig,

    /// Password and session configuration
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Connection pool size
    pub pool_size: u32,

    /// How long a connection waits on a locked database
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

/// Password and session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of a bearer token
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,

    /// Minimum accepted password length at registration
    pub min_password_length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus exporter
    pub enabled: bool,

    /// Prometheus scrape listener address
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/idshare.db"),
            pool_size: 8,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(12 * 60 * 60),
            min_password_length: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 9090)),
        }
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

impl Config {
    /// Defaults plus environment overrides
    ///
    /// Example: IDSHARE_SERVER_BIND_ADDRESS=0.0.0.0:8080
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// File (if given) then environment, validated
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay IDSHARE_<SECTION>_<KEY> values from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |section: &str, key: &str| {
            let name = format!("{}_{}_{}", ENV_PREFIX, section, key);
            lookup(&name).map(|value| (name, value))
        };

        // Server
        if let Some((k, v)) = var("SERVER", "BIND_ADDRESS") {
            self.server.bind_address = parse_var(&k, &v)?;
        }
        if let Some((k, v)) = var("SERVER", "SHUTDOWN_TIMEOUT") {
            self.server.shutdown_timeout = parse_duration(&k, &v)?;
        }

        // Store
        if let Some((_, v)) = var("STORE", "DATABASE_PATH") {
            self.store.database_path = PathBuf::from(v);
        }
        if let Some((k, v)) = var("STORE", "POOL_SIZE") {
            self.store.pool_size = parse_var(&k, &v)?;
        }
        if let Some((k, v)) = var("STORE", "BUSY_TIMEOUT") {
            self.store.busy_timeout = parse_duration(&k, &v)?;
        }

        // Auth
        if let Some((k, v)) = var("AUTH", "SESSION_TTL") {
            self.auth.session_ttl = parse_duration(&k, &v)?;
        }
        if let Some((k, v)) = var("AUTH", "MIN_PASSWORD_LENGTH") {
            self.auth.min_password_length = parse_var(&k, &v)?;
        }

        // Logging
        if let Some((_, v)) = var("LOGGING", "LEVEL") {
            self.logging.level = v.to_lowercase();
        }
        if let Some((k, v)) = var("LOGGING", "JSON_FORMAT") {
            self.logging.json_format = parse_var(&k, &v)?;
        }
        if let Some((k, v)) = var("LOGGING", "WITH_TARGET") {
            self.logging.with_target = parse_var(&k, &v)?;
        }

        // Metrics
        if let Some((k, v)) = var("METRICS", "ENABLED") {
            self.metrics.enabled = parse_var(&k, &v)?;
        }
        if let Some((k, v)) = var("METRICS", "BIND_ADDRESS") {
            self.metrics.bind_address = parse_var(&k, &v)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "store.pool_size must be greater than 0".to_string(),
            ));
        }

        if self.store.database_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "store.database_path must not be empty".to_string(),
            ));
        }

        if self.auth.session_ttl.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "auth.session_ttl must be greater than 0".to_string(),
            ));
        }

        if self.auth.min_password_length == 0 {
            return Err(ConfigError::ValidationFailed(
                "auth.min_password_length must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        if self.metrics.enabled && self.metrics.bind_address == self.server.bind_address {
            return Err(ConfigError::ValidationFailed(
                "metrics.bind_address must differ from server.bind_address".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(())
    }
}
