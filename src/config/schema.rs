//! Configuration schema for Sushibox
//!
//! Configuration is stored at `~/.config/sushibox/config.toml`. Every key is
//! optional; a missing file is the same as an empty one.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Install cache settings
    pub cache: CacheConfig,

    /// Logging settings
    pub log: LogConfig,
}

/// Install cache configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base directory replacing the platform state directory
    pub state_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `sushibox=debug`
    pub filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_all_sections() {
        let config: Config = toml::from_str(
            r#"
[cache]
state_dir = "/var/lib/tools"

[log]
filter = "sushibox=debug"
"#,
        )
        .unwrap();

        assert_eq!(config.cache.state_dir, Some(PathBuf::from("/var/lib/tools")));
        assert_eq!(config.log.filter.as_deref(), Some("sushibox=debug"));
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(toml::from_str::<Config>("[cache]\nstate_dir = 3\n").is_err());
    }
}
