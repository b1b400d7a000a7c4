//! Configuration management for the OFS client.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/ofs/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use protocol::RequestIdStrategy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientOptions;
use crate::recovery::{RecoveryPolicy, DEFAULT_NOT_FOUND_MARKER};
use crate::session::{PrivilegePolicy, DEFAULT_PRIVILEGED_IDENTITY};
use crate::transport::{TcpTransport, DEFAULT_MAX_RESPONSE_BYTES};

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(u16),

    #[error("timeout_ms must be between 1 and 60000, got {0}")]
    InvalidTimeout(u64),

    #[error("max_response_bytes must be greater than 0, got {0}")]
    InvalidMaxResponseBytes(usize),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound accepted for `timeout_ms`.
const MAX_TIMEOUT_MS: u64 = 60_000;

/// Main configuration structure for the OFS client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Where the server is and how long to wait for it.
    pub server: ServerConfig,

    /// Session and protocol behaviour.
    pub session: SessionConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Server address and transport limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host name or IP address of the OFS server.
    pub host: String,

    /// TCP port of the OFS server.
    pub port: u16,

    /// Bound on connect, write, and each read, in milliseconds.
    pub timeout_ms: u64,

    /// Largest response accepted; longer responses are truncated.
    pub max_response_bytes: usize,
}

/// Session and protocol behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Identity treated as privileged after login. Empty disables the check.
    pub privileged_identity: String,

    /// Correlation id sent with every request.
    pub request_id: String,

    /// Send a fresh UUID per request instead of `request_id`.
    pub random_request_ids: bool,

    /// Phrase in a listing error that means the directory has vanished.
    pub not_found_marker: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            timeout_ms: 2000,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            privileged_identity: DEFAULT_PRIVILEGED_IDENTITY.to_string(),
            request_id: protocol::DEFAULT_REQUEST_ID.to_string(),
            random_request_ids: false,
            not_found_marker: DEFAULT_NOT_FOUND_MARKER.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ofs")
        .join("config.toml")
}

impl ServerConfig {
    /// `host:port`, bracketing bare IPv6 literals.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ClientConfig {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - OFS_SERVER_HOST: Override server host
    /// - OFS_SERVER_PORT: Override server port
    /// - OFS_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("OFS_SERVER_HOST") {
            if !host.is_empty() {
                tracing::info!("Overriding server host from environment: {}", host);
                self.server.host = host;
            }
        }

        if let Ok(port) = std::env::var("OFS_SERVER_PORT") {
            match port.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Overriding server port from environment: {}", port);
                    self.server.port = port;
                }
                Err(_) if port.is_empty() => {}
                Err(_) => tracing::warn!("Ignoring unparseable OFS_SERVER_PORT: {}", port),
            }
        }

        if let Ok(level) = std::env::var("OFS_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.logging.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }

        if self.server.timeout_ms == 0 || self.server.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::InvalidTimeout(self.server.timeout_ms));
        }

        if self.server.max_response_bytes == 0 {
            return Err(ConfigError::InvalidMaxResponseBytes(
                self.server.max_response_bytes,
            ));
        }

        let level = self.logging.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.log_level.clone()));
        }

        Ok(())
    }

    /// Build the transport described by the `[server]` section.
    pub fn transport(&self) -> TcpTransport {
        TcpTransport::new(self.server.address())
            .with_timeout(self.server.timeout())
            .with_max_response_bytes(self.server.max_response_bytes)
    }

    /// Build the client options described by the `[session]` section.
    pub fn client_options(&self) -> ClientOptions {
        let privilege = if self.session.privileged_identity.is_empty() {
            PrivilegePolicy::disabled()
        } else {
            PrivilegePolicy::identity(self.session.privileged_identity.clone())
        };

        let request_ids = if self.session.random_request_ids {
            RequestIdStrategy::Random
        } else {
            RequestIdStrategy::Fixed(self.session.request_id.clone())
        };

        ClientOptions {
            privilege,
            recovery: RecoveryPolicy::with_marker(self.session.not_found_marker.clone()),
            request_ids,
        }
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
