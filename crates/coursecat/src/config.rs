//! Configuration management for coursecat.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "coursecat";

/// Default catalog file name.
const CATALOG_FILE_NAME: &str = "course_catalog.json";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "COURSECAT_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `COURSECAT_`, nested keys joined
///    with `__`, e.g. `COURSECAT_SERVER__BIND`)
/// 2. TOML config file at `~/.config/coursecat/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Tracing and log output configuration.
    pub telemetry: TelemetryConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
    /// Key material for signing flash-message cookies.
    pub secret_key: String,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the catalog JSON file.
    /// Defaults to `~/.local/share/coursecat/course_catalog.json`
    pub catalog_path: Option<PathBuf>,
}

/// Tracing and log output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every request span.
    pub service_name: String,
    /// Emit log lines as JSON instead of plain text.
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            secret_key: "secret".to_string(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "course-catalog-service".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(Error::config_validation(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            )));
        }

        if self.server.secret_key.is_empty() {
            return Err(Error::config_validation(
                "server.secret_key must not be empty",
            ));
        }

        if self.telemetry.service_name.trim().is_empty() {
            return Err(Error::config_validation(
                "telemetry.service_name must not be empty",
            ));
        }

        if let Some(path) = &self.storage.catalog_path {
            if path.file_name().is_none() {
                return Err(Error::config_validation(format!(
                    "storage.catalog_path must name a file: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Get the catalog path, resolving defaults if not set.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.storage
            .catalog_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(CATALOG_FILE_NAME))
    }

    /// Get the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.bind` does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.parse().map_err(|_| {
            Error::config_validation(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            ))
        })
    }
}
