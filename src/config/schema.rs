//! Configuration schema for pyp
//!
//! Configuration is stored at `~/.config/pyp/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Package launch settings
    pub launcher: LauncherConfig,

    /// Side-file cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// What to do when a dependency package cannot be installed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallErrorPolicy {
    /// Record the failure and continue with the next package
    #[default]
    Skip,
    /// Stop installing at the first bad package
    Abort,
}

/// Package launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Interpreter used to execute the entry script
    pub interpreter: String,

    /// Base directory for per-run extraction roots (system temp dir if unset)
    pub temp_root: Option<PathBuf>,

    /// Dependency package failure handling
    pub on_install_error: InstallErrorPolicy,

    /// Entries per page in the package browser
    pub page_size: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            temp_root: None,
            on_install_error: InstallErrorPolicy::default(),
            page_size: 25,
        }
    }
}

/// Side-file cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Persistent cache root (platform data directory if unset)
    pub root: Option<PathBuf>,

    /// Digest used to name cache directories: "md5" or "sha256"
    pub digest: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            digest: "md5".to_string(),
        }
    }
}
