//! Configuration management for Sushibox
//!
//! Paths and the embedded version are resolved once into an immutable
//! [`Settings`] value that every component receives by reference.

pub mod schema;

pub use schema::Config;

use crate::error::{SushiboxError, SushiboxResult};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Canonical product name; invoking the launcher under any other name
/// dispatches to the command of that name
pub const PRODUCT: &str = "sushibox";

/// Environment variable overriding the config file path
pub const CONFIG_ENV: &str = "SUSHIBOX_CONFIG";

/// Environment variable overriding the state directory
pub const STATE_DIR_ENV: &str = "SUSHIBOX_STATE_DIR";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager, honouring `SUSHIBOX_CONFIG`
    pub fn new() -> Self {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::with_path(PathBuf::from(path)),
            _ => Self::with_path(Self::default_config_path()),
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
            .join(PRODUCT)
            .join("config.toml")
    }

    /// Platform state directory, before any override
    pub fn default_state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load configuration, using defaults if the file does not exist
    pub fn load(&self) -> SushiboxResult<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SushiboxError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })?;

        toml::from_str(&content).map_err(|e| SushiboxError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: one_line(&e),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// Parse error as a single line: position, then the message
fn one_line(err: &toml::de::Error) -> String {
    let rendered = err.to_string();
    let position = rendered.lines().next().unwrap_or_default();
    let message = err.message().lines().map(str::trim).collect::<Vec<_>>().join("; ");
    if position.is_empty() || position == message {
        message
    } else {
        format!("{}: {}", position, message)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk layout for one version of the bundle
///
/// ```text
/// <state_dir>/sushibox/versions/<version>/...         cache root
/// <state_dir>/sushibox/versions/<version>/bin/<cmd>   dispatchable commands
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// User state directory the product directory lives in
    pub state_dir: PathBuf,
    /// Parent of all version directories; staging directories live here too
    pub versions_dir: PathBuf,
    /// Extracted bundle for this version
    pub cache_root: PathBuf,
    /// Directory holding the dispatchable commands
    pub bin_root: PathBuf,
}

impl Layout {
    /// Compute the layout for `version` under `state_dir`
    pub fn new(state_dir: impl Into<PathBuf>, version: &str) -> Self {
        let state_dir = state_dir.into();
        let versions_dir = state_dir.join(PRODUCT).join("versions");
        let cache_root = versions_dir.join(version);
        let bin_root = cache_root.join("bin");
        Self {
            state_dir,
            versions_dir,
            cache_root,
            bin_root,
        }
    }
}

/// Everything the launcher needs to know about its environment, resolved once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Canonical product name
    pub product: &'static str,
    /// Embedded bundle version
    pub version: &'static str,
    /// Cache paths for `version`
    pub layout: Layout,
    /// Log filter from the config file, if any
    pub log_filter: Option<String>,
    /// Config file consulted, when settings came from the environment
    pub config_path: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from the environment and the config file
    ///
    /// State directory precedence: `SUSHIBOX_STATE_DIR`, then
    /// `cache.state_dir` from the config file, then the platform default.
    pub fn resolve(version: &'static str) -> SushiboxResult<Self> {
        let manager = ConfigManager::new();
        let config = manager.load()?;
        let settings = Self::from_config(version, &config, std::env::var_os(STATE_DIR_ENV));
        Ok(Self {
            config_path: Some(manager.path().to_path_buf()),
            ..settings
        })
    }

    /// Build settings from an already-loaded config and state dir override
    pub fn from_config(
        version: &'static str,
        config: &Config,
        state_dir_override: Option<OsString>,
    ) -> Self {
        let state_dir = state_dir_override
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| config.cache.state_dir.clone())
            .unwrap_or_else(ConfigManager::default_state_dir);

        Self {
            product: PRODUCT,
            version,
            layout: Layout::new(state_dir, version),
            log_filter: config.log.filter.clone(),
            config_path: None,
        }
    }
}
