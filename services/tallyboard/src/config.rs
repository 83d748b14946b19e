//! Configuration types for the tallyboard service

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Realtime database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Base URL of the realtime database, e.g.
    /// `https://my-project-default-rtdb.firebasedatabase.app`
    #[serde(default = "default_database_url")]
    pub base_url: String,
    /// Optional auth token appended as the `auth` query parameter
    #[serde(default)]
    pub auth: Option<String>,
    /// Delay before reopening a lost change stream
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            base_url: default_database_url(),
            auth: None,
            reconnect_delay_seconds: default_reconnect_delay(),
        }
    }
}

/// Dashboard web server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

/// Startup seeding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Seed the default document when the data tree is empty
    #[serde(default = "default_true")]
    pub seed: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { seed: true }
    }
}

fn default_database_url() -> String {
    // Local RTDB emulator
    "http://127.0.0.1:9000".to_string()
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11180
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::TallyboardError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
