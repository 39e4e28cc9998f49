//! Server configuration file
//!
//! Looked up in this order: the `--config` path, then `hustings.toml` in the
//! platform config directory, then built-in defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use hustings_core::RoomConfig;
use hustings_net::{IdleSweep, DEFAULT_PORT};
use serde::{Deserialize, Serialize};

/// Config file name inside the platform config directory
const CONFIG_FILE: &str = "hustings.toml";

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] hustings_core::Error),
}

/// Top-level server config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: SocketAddr,
    /// Evict rooms idle this long; 0 disables eviction
    pub idle_timeout_secs: u64,
    /// How often the idle sweep runs
    pub sweep_interval_secs: u64,
    /// Settings applied to every room
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            idle_timeout_secs: 3600,
            sweep_interval_secs: 60,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse and validate from TOML content
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content)?;
        config.room.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Resolve the config to use, returning where it came from
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        match default_path() {
            Some(path) if path.exists() => Ok((Self::load(&path)?, Some(path))),
            _ => Ok((Self::default(), None)),
        }
    }

    /// Idle sweep schedule, if eviction is enabled
    pub fn idle_sweep(&self) -> Option<IdleSweep> {
        if self.idle_timeout_secs == 0 {
            return None;
        }
        Some(IdleSweep {
            max_idle: Duration::from_secs(self.idle_timeout_secs),
            interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
        })
    }
}

/// Platform config file location
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "hustings", "hustings").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.bind.port(), DEFAULT_PORT);
        assert_eq!(config.room, RoomConfig::default());
        let sweep = config.idle_sweep().unwrap();
        assert_eq!(sweep.max_idle, Duration::from_secs(3600));
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
bind = "127.0.0.1:9000"
idle_timeout_secs = 0

[room]
population_capacity = 500
max_participants = 12
"#;
        let config = ServerConfig::from_toml(toml).unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert!(config.idle_sweep().is_none());
        assert_eq!(config.room.population_capacity, 500);
        assert_eq!(config.room.max_participants, Some(12));
        assert_eq!(config.room.initial_quality, 0.5);
    }

    #[test]
    fn test_invalid_room_section() {
        let result = ServerConfig::from_toml("[room]\ninitial_quality = -1.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_resolve_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "sweep_interval_secs = 5\n").unwrap();

        let (config, source) = ServerConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.sweep_interval_secs, 5);
        assert_eq!(source, Some(path));
    }

    #[test]
    fn test_resolve_missing_explicit_path() {
        let temp = TempDir::new().unwrap();
        let result = ServerConfig::resolve(Some(&temp.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
