use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Prefix for environment variable overrides, e.g. `PRLINK_SERVER__PORT`.
pub const ENV_PREFIX: &str = "PRLINK_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Namespace cannot be empty")]
    EmptyNamespace,

    #[error("Event prefix cannot be empty")]
    EmptyEventPrefix,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid port: {0}. Must be non-zero")]
    InvalidPort(u16),

    #[error("Invalid max_write_attempts: {0}. Must be at least 1")]
    InvalidMaxWriteAttempts(u32),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .prlink/config.yaml (project config)
    /// 3. .prlink/local.yaml (project local overrides, optional)
    /// 4. Environment variables (PRLINK_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_with_paths(&[
            PathBuf::from(".prlink/config.yaml"),
            PathBuf::from(".prlink/local.yaml"),
        ])
    }

    /// Load configuration from a specific file. Environment variables
    /// still override it.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file {} does not exist", path.display());
        }
        Self::load_with_paths(&[path.to_path_buf()])
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    /// Merge defaults, each YAML file in order (missing files are
    /// skipped), then environment variables.
    pub fn load_with_paths(paths: &[PathBuf]) -> Result<Config> {
        let figment = paths.iter().fold(
            Figment::new().merge(Serialized::defaults(Config::default())),
            |figment, path| figment.merge(Yaml::file(path)),
        );

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }

        if config.event_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyEventPrefix);
        }

        // Validate database config
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort(config.server.port));
        }

        if config.link_store.max_write_attempts == 0 {
            return Err(ConfigError::InvalidMaxWriteAttempts(
                config.link_store.max_write_attempts,
            ));
        }

        for rule in &config.label_rules {
            if rule.label.is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Label rule label cannot be empty".to_string(),
                ));
            }
            if rule.workflow_status.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Label rule '{}' workflow_status cannot be empty",
                    rule.label
                )));
            }
        }

        if config.github.token_env.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "github.token_env cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
