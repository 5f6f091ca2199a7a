//! Configuration loading.
//!
//! The host application owns a single `courier.toml`:
//! - `[database]`: backing store for audit and tracker rows
//! - `[logging]`: log level and optional log directory
//! - `[providers]`: default primary/secondary gateway names

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::sms::ProviderPair;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct CourierConfig {
    /// Backing store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Default gateway pair for outbound messages.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// SQLite backing store settings.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (e.g. `sqlite://courier.db` or `sqlite::memory:`).
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for JSON log files. Console-only when absent.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

/// Default gateway names used when the caller does not pick a pair.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Gateway tried first.
    #[serde(default)]
    pub primary: String,

    /// Gateway tried once when the primary fails.
    #[serde(default)]
    pub secondary: String,
}

impl From<&ProvidersConfig> for ProviderPair {
    fn from(config: &ProvidersConfig) -> Self {
        ProviderPair::new(config.primary.clone(), config.secondary.clone())
    }
}

// Default value functions for serde

fn default_database_url() -> String {
    "sqlite://courier.db".to_owned()
}
fn default_max_connections() -> u32 {
    5
}
fn default_log_level() -> String {
    "info".to_owned()
}

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<CourierConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: CourierConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Resolve the default config directory (`~/.courier/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".courier"))
}
