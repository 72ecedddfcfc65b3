//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/weld-connect/config.toml)
//! 3. Environment variables (WELD_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "WELD";

/// Default Weld Connect API endpoint
pub const DEFAULT_BASE_URL: &str = "https://connect.weld.app";

/// Default port for the local authorization callback listener
pub const DEFAULT_CALLBACK_PORT: u16 = 8765;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Weld Connect API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as `X-API-KEY` on every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Pre-configured connection id; seeds the wizard past authorization
    #[serde(default)]
    pub connection_id: Option<String>,

    /// Port the authorization callback listener binds on 127.0.0.1
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,

    /// Default label for new connection bridges
    #[serde(default = "default_connection_label")]
    pub connection_label: String,

    /// Log file for the TUI (defaults to {data_dir}/debug.log)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            connection_id: None,
            callback_port: default_callback_port(),
            connection_label: default_connection_label(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (WELD_CONNECT_URL, WELD_CONNECT_API_KEY, ...)
    /// 2. Config file (~/.config/weld-connect/config.toml or WELD_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit `--config` path when given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = Self::load_file_only(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load only what the file at `path` holds, without environment overrides
    ///
    /// Use this before writing the file back so env-only values (an API key
    /// in particular) never end up on disk.
    pub fn load_file_only(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // WELD_CONNECT_URL
        if let Ok(val) = std::env::var(format!("{}_CONNECT_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.base_url = val;
            }
        }

        // WELD_CONNECT_API_KEY
        if let Ok(val) = std::env::var(format!("{}_CONNECT_API_KEY", ENV_PREFIX)) {
            self.api_key = non_empty(val);
        }

        // WELD_CONNECTION_ID
        if let Ok(val) = std::env::var(format!("{}_CONNECTION_ID", ENV_PREFIX)) {
            self.connection_id = non_empty(val);
        }

        // WELD_CALLBACK_PORT
        if let Ok(val) = std::env::var(format!("{}_CALLBACK_PORT", ENV_PREFIX)) {
            if let Ok(port) = val.parse() {
                self.callback_port = port;
            }
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with WELD_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weld-connect")
            .join("config.toml")
    }

    /// Directory for local state such as the TUI debug log
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weld-connect")
    }

    /// Log file used by the TUI when WELD_LOG is set
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("debug.log"))
    }

    /// Redirect URI handed to new connection bridges
    pub fn redirect_uri(&self) -> String {
        format!(
            "http://127.0.0.1:{}{}",
            self.callback_port,
            crate::auth::CALLBACK_PATH
        )
    }

    /// The configured API key, if it is non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

fn non_empty(val: String) -> Option<String> {
    if val.is_empty() {
        None
    } else {
        Some(val)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_callback_port() -> u16 {
    DEFAULT_CALLBACK_PORT
}

fn default_connection_label() -> String {
    "my-connection".to_string()
}
