//! Configuration management for devlog

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::environment::{EnvironmentMode, HostEnvironment, HostPolicy, SystemProbe};
use crate::logging::ConsoleKind;

/// Environment detection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// "auto" (default), "development" or "production"
    #[serde(default)]
    pub mode: EnvironmentMode,

    /// Variable holding an explicit environment name (default: DEVLOG_ENV)
    #[serde(default = "default_override_var")]
    pub override_var: String,

    /// Variable that replaces the OS hostname (default: DEVLOG_HOST)
    #[serde(default = "default_host_var")]
    pub host_var: String,

    /// Hostname patterns treated as development
    #[serde(default)]
    pub hosts: HostPolicy,
}

fn default_override_var() -> String {
    "DEVLOG_ENV".to_string()
}

fn default_host_var() -> String {
    "DEVLOG_HOST".to_string()
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            mode: EnvironmentMode::default(),
            override_var: default_override_var(),
            host_var: default_host_var(),
            hosts: HostPolicy::default(),
        }
    }
}

impl EnvironmentConfig {
    /// Build the environment oracle described by these settings
    pub fn oracle(&self) -> HostEnvironment {
        let probe = SystemProbe {
            override_var: self.override_var.clone(),
            host_var: self.host_var.clone(),
        };
        HostEnvironment::new(self.mode, self.hosts.clone(), Box::new(probe))
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Console sink: "stdout" (default), "tracing" or "silent"
    #[serde(default)]
    pub console: ConsoleKind,

    /// Fallback filter for devlog's own diagnostics when RUST_LOG is unset
    #[serde(default = "default_diagnostics_filter")]
    pub diagnostics_filter: String,

    #[serde(default)]
    pub environment: EnvironmentConfig,
}

fn default_diagnostics_filter() -> String {
    "devlog=info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            console: ConsoleKind::default(),
            diagnostics_filter: default_diagnostics_filter(),
            environment: EnvironmentConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path, or return default if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }
}

/// Get the base configuration directory (~/.devlog)
/// Falls back to ./.devlog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".devlog")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".devlog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
