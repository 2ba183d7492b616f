use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for prlink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Namespace under which link fields are stored on records and the account
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Prefix for emitted domain event names
    #[serde(default = "default_event_prefix")]
    pub event_prefix: String,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Webhook receiver configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Link store write policy
    #[serde(default)]
    pub link_store: LinkStoreSettings,

    /// Label → workflow status rules applied on labeled pull requests
    #[serde(default = "default_label_rules")]
    pub label_rules: Vec<LabelRule>,

    /// GitHub API access
    #[serde(default)]
    pub github: GitHubConfig,
}

fn default_namespace() -> String {
    "aha-develop.github".to_string()
}

fn default_event_prefix() -> String {
    "aha-develop.github".to_string()
}

fn default_label_rules() -> Vec<LabelRule> {
    vec![LabelRule {
        label: "documentation".to_string(),
        workflow_status: "Will not implement".to_string(),
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            event_prefix: default_event_prefix(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            link_store: LinkStoreSettings::default(),
            label_rules: default_label_rules(),
            github: GitHubConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".prlink/prlink.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Webhook receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    9110
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Write policy for read-modify-write updates of link fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LinkStoreSettings {
    /// Use version-checked writes and retry on conflict
    #[serde(default = "default_optimistic_writes")]
    pub optimistic_writes: bool,

    /// Attempts per field update when optimistic writes are enabled
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,
}

const fn default_optimistic_writes() -> bool {
    true
}

const fn default_max_write_attempts() -> u32 {
    5
}

impl Default for LinkStoreSettings {
    fn default() -> Self {
        Self {
            optimistic_writes: default_optimistic_writes(),
            max_write_attempts: default_max_write_attempts(),
        }
    }
}

/// Maps a pull request label to the workflow status it sets on linked records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LabelRule {
    pub label: String,
    pub workflow_status: String,
}

/// GitHub API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GitHubConfig {
    /// GraphQL endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Name of the environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_api_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_env: default_token_env(),
        }
    }
}
