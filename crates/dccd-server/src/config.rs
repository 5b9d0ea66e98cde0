//! Configuration management for the DCCD archive service.
//!
//! Configuration is loaded from three sources, later ones overriding
//! earlier ones:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (`DCCD_` prefix, `__` nested-key separator)
//!
//! # Example
//!
//! ```ignore
//! use dccd_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("config.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Network settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Import pipeline settings
    #[serde(default)]
    pub import: ImportSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum upload body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> usize {
    // uploaded bundles carry binary attachments; allow 64MB
    64 * 1024 * 1024
}

/// Import pipeline settings.
///
/// The bundle layout itself is fixed; these settings name its parts and
/// the defaults applied when bundle metadata is silent.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ImportSettings {
    /// Name of the bundle's data folder.
    /// Environment variable: `DCCD_IMPORT__DATA_FOLDER_NAME`
    #[serde(default = "default_data_folder")]
    pub data_folder_name: String,

    /// Name of the raw value-file subfolder.
    #[serde(default = "default_values_folder")]
    pub values_folder_name: String,

    /// Name of the associated-file subfolder.
    #[serde(default = "default_associated_folder")]
    pub associated_folder_name: String,

    /// Prefix for temporary unzip directories.
    #[serde(default = "default_temp_prefix")]
    pub temp_dir_prefix: String,

    /// Language assumed when bundle metadata does not declare one.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Value-file format assumed when bundle metadata does not declare one.
    #[serde(default = "default_values_format")]
    pub default_values_format: String,

    /// Append-only import audit log; disabled when unset.
    #[serde(default)]
    pub audit_log: Option<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            data_folder_name: default_data_folder(),
            values_folder_name: default_values_folder(),
            associated_folder_name: default_associated_folder(),
            temp_dir_prefix: default_temp_prefix(),
            default_language: default_language(),
            default_values_format: default_values_format(),
            audit_log: None,
        }
    }
}

fn default_data_folder() -> String {
    "data".to_string()
}

fn default_values_folder() -> String {
    "values".to_string()
}

fn default_associated_folder() -> String {
    "associated".to_string()
}

fn default_temp_prefix() -> String {
    "dccd-rest-unzip".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_values_format() -> String {
    "Heidelberg".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted log lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Loads configuration from a YAML file with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::new(
                path.as_ref().to_str().unwrap_or_default(),
                FileFormat::Yaml,
            ))
            .add_source(env_source())
            .build()?;
        config.try_deserialize()
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder().add_source(env_source()).build()?;
        config.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("DCCD").separator("__")
}
