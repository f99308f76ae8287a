//! Configuration management for pyp

pub mod schema;

pub use schema::{CacheConfig, Config, GeneralConfig, InstallErrorPolicy, LauncherConfig};

use crate::error::{LauncherError, LauncherResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name used under the platform config/data directories
const APP_DIR: &str = "pyp";

/// Cache root when neither the config nor `APPDATA` names one
pub const FALLBACK_CACHE_ROOT: &str = "/tmp/pypdata";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Resolve the persistent cache root.
    ///
    /// Order: explicit config value, `APPDATA`, then the fixed
    /// [`FALLBACK_CACHE_ROOT`] shared with earlier launchers.
    pub fn cache_root(config: &Config) -> PathBuf {
        if let Some(ref root) = config.cache.root {
            return root.clone();
        }

        match std::env::var_os("APPDATA") {
            Some(appdata) if !appdata.is_empty() => PathBuf::from(appdata),
            _ => PathBuf::from(FALLBACK_CACHE_ROOT),
        }
    }

    /// Resolve the base directory for extraction roots
    pub fn temp_root(config: &Config) -> PathBuf {
        config
            .launcher
            .temp_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Load configuration, using defaults if the file does not exist
    pub fn load(&self) -> LauncherResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(&self, path: &Path) -> LauncherResult<Config> {
        let content = fs::read_to_string(path)
            .map_err(|e| LauncherError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| LauncherError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> LauncherResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| LauncherError::ConfigDirCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).map_err(|e| {
            LauncherError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
