//! Configuration loading and typed config structures for the relay.
//!
//! Configuration lives in an optional `obsentra-config.yaml`. Every field
//! has a default, so a missing file or a partial file is fine. A handful of
//! environment variables override the file for container deployments.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Default config file name, looked up relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "obsentra-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Fan-out settings.
    #[serde(default)]
    pub relay: RelaySection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a YAML file, falling back to defaults when
    /// the file does not exist. Environment overrides are applied either way.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if an existing file cannot be read, or
    /// [`ConfigError::Yaml`] if its content is not valid YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `OBSENTRA_HOST` overrides `server.host`
    /// - `OBSENTRA_PORT` overrides `server.port`
    /// - `OBSENTRA_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("OBSENTRA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("OBSENTRA_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!(value = %port, error = %e, "ignoring invalid OBSENTRA_PORT"),
            }
        }
        if let Some(level) = lookup("OBSENTRA_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

/// HTTP / `WebSocket` listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow requests from any origin.
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_permissive: true,
        }
    }
}

/// Fan-out configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelaySection {
    /// Outbound payloads buffered per subscriber before it counts as stalled
    /// and is dropped.
    #[serde(default = "default_subscriber_queue_capacity")]
    pub subscriber_queue_capacity: usize,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: default_subscriber_queue_capacity(),
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (e.g. `info`, `obsentra_core=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    3000
}

const fn default_true() -> bool {
    true
}

const fn default_subscriber_queue_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    String::from("info")
}
