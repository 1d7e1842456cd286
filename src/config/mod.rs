//! Configuration management for userscripts
//!
//! Handles configuration loading and the script directory layout.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// First level of the script directory subpath
pub const APP_DIR: &str = "userscripts";

/// Second level of the script directory subpath
pub const SCRIPTS_DIR: &str = "modules";

/// Where scripts are stored under a platform base directory
pub fn script_dir(base: &Path) -> PathBuf {
    base.join(APP_DIR).join(SCRIPTS_DIR)
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "userscripts=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON log lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Script loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Directory of local scripts (default: `<data dir>/userscripts/modules`)
    #[serde(default)]
    pub local_dir: Option<PathBuf>,

    /// Cache of retrieved scripts (default: `<cache dir>/userscripts/modules`)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Seconds a manifest hook command may run
    #[serde(default = "default_hook_timeout_secs")]
    pub hook_timeout_secs: u64,

    /// User agent sent when retrieving scripts over HTTP
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

fn default_hook_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("userscripts/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            local_dir: None,
            cache_dir: None,
            hook_timeout_secs: default_hook_timeout_secs(),
            user_agent: default_user_agent(),
            logging: None,
        }
    }
}

impl LoaderConfig {
    /// Directory local scripts are discovered in
    pub fn local_module_dir(&self) -> PathBuf {
        self.local_dir.clone().unwrap_or_else(|| {
            script_dir(&dirs::data_dir().unwrap_or_else(|| fallback_base().join("share")))
        })
    }

    /// Directory retrieved scripts are cached in
    pub fn remote_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| script_dir(&dirs::cache_dir().unwrap_or_else(|| fallback_base().join("cache"))))
    }

    /// Load configuration, choosing the format by extension (`.toml` or JSON)
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            _ => Self::from_json_file(path),
        }
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LoaderConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LoaderConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn fallback_base() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".local"))
        .unwrap_or_else(|| PathBuf::from("."))
}
