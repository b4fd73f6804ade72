//! Settings file and its location.
//!
//! The settings file is JSON and every field is optional. Values in it
//! replace the built-in defaults; command-line flags replace both.

use crate::error::{ConfigError, ConfigResult};
use crate::output::OutputFormat;
use crate::scanner::BackoffKind;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory paths following the XDG base directory layout.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/jarmscan)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the platform directories, if the platform has a home directory.
    pub fn discover() -> Option<Self> {
        let project = ProjectDirs::from("com", "jarmscan", "jarmscan")?;
        Some(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Defaults for every scan option except targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Port specification used for targets without an explicit port.
    pub ports: String,
    /// Number of concurrent workers.
    pub workers: usize,
    /// Extra connection attempts per probe.
    pub retries: u32,
    pub backoff: BackoffKind,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
    /// Connection attempts per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Report unreachable targets instead of dropping them.
    pub emit_failures: bool,
    pub output: OutputFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            ports: "443".to_string(),
            workers: 256,
            retries: 0,
            backoff: BackoffKind::Fixed,
            connect_timeout_ms: 2000,
            io_timeout_ms: 5000,
            rate_limit: 0,
            emit_failures: false,
            output: OutputFormat::Plain,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults
    /// when there is no settings file.
    pub fn load() -> ConfigResult<Self> {
        match Paths::discover().map(|paths| paths.settings_file()) {
            Some(file) if file.exists() => Self::load_from(&file),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }
}
