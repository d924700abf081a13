//! Configuration for the dispatcher and the page agent.
//!
//! Loads configuration from TOML files and provides runtime defaults.
//! User-facing preferences (item cap, sync, auto-save) are not here; they live
//! in the store as `Settings`.

use crate::agent::{DEFAULT_CHORD, DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/syncopy.sock";
pub const DEFAULT_AGENT_SOCKET_PATH: &str = "/tmp/syncopy-agent.sock";

/// Environment variable overriding the dispatcher socket
pub const SOCKET_ENV: &str = "SYNCOPY_SOCKET";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket the dispatcher listens on
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// SQLite database holding items, boards and settings
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Socket of the page agent, used for quick copy
    #[serde(default = "default_agent_socket_path")]
    pub agent_socket_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            db_path: default_db_path(),
            agent_socket_path: default_agent_socket_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Whether the clipboard poller runs
    #[serde(default = "default_true")]
    pub poll_clipboard: bool,

    /// Clipboard poll interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Local capture shortcut, e.g. "Ctrl+Shift+C"
    #[serde(default = "default_chord")]
    pub chord: String,

    /// Page address attached to captures
    #[serde(default)]
    pub source_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_clipboard: true,
            poll_interval_ms: default_poll_interval(),
            chord: default_chord(),
            source_url: None,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("syncopy")
        .join("clipboard.db")
}

fn default_agent_socket_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_AGENT_SOCKET_PATH))
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_chord() -> String {
    DEFAULT_CHORD.to_string()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config file found at {0:?}")]
    Missing(PathBuf),
    #[error("Failed to read config file {0:?}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("Failed to parse config file {0:?}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

/// Where a loaded configuration came from.
///
/// Loading happens before the subscriber is installed, so binaries call `log`
/// once logging is up.
#[derive(Debug)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults(ConfigError),
}

impl ConfigOrigin {
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded configuration from {:?}", path),
            ConfigOrigin::Defaults(ConfigError::Missing(path)) => {
                info!("No config file found at {:?}, using defaults", path)
            }
            ConfigOrigin::Defaults(e) => warn!("{}, using defaults", e),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default path), falling back to
    /// defaults when the file is missing or invalid. Environment overrides
    /// are applied either way.
    pub fn load(path: Option<PathBuf>) -> (Self, ConfigOrigin) {
        let path = path.unwrap_or_else(Self::default_config_path);
        let (mut config, origin) = match Self::read_from_path(&path) {
            Ok(config) => (config, ConfigOrigin::File(path)),
            Err(e) => (Self::default(), ConfigOrigin::Defaults(e)),
        };
        config.apply_env();
        (config, origin)
    }

    /// Parse a configuration file
    pub fn read_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::Missing(path.to_path_buf()),
            _ => ConfigError::Io(path.to_path_buf(), e),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Override file values from the environment
    pub fn apply_env(&mut self) {
        if let Some(socket) = std::env::var_os(SOCKET_ENV).filter(|v| !v.is_empty()) {
            self.server.socket_path = PathBuf::from(socket);
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("syncopy")
            .join("config.toml")
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
        assert!(config.server.db_path.ends_with("syncopy/clipboard.db"));
        assert_eq!(config.agent.poll_interval_ms, 2000);
        assert_eq!(config.agent.chord, "Ctrl+Shift+C");
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[server]
socket_path = "/run/user/1000/syncopy.sock"

[agent]
poll_clipboard = false
chord = "Alt+Shift+S"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(
            config.server.socket_path,
            PathBuf::from("/run/user/1000/syncopy.sock")
        );
        assert_eq!(
            config.server.agent_socket_path,
            Some(PathBuf::from(DEFAULT_AGENT_SOCKET_PATH))
        );
        assert!(!config.agent.poll_clipboard);
        assert_eq!(config.agent.chord, "Alt+Shift+S");
        assert_eq!(config.agent.poll_interval_ms, 2000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.agent.poll_interval_ms = 500;
        config.server.db_path = dir.path().join("clips.db");
        config.save_to_path(&path).unwrap();

        let (loaded, origin) = Config::load(Some(path.clone()));
        assert!(matches!(origin, ConfigOrigin::File(p) if p == path));
        assert_eq!(loaded.agent.poll_interval_ms, 500);
        assert_eq!(loaded.server.db_path, dir.path().join("clips.db"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, origin) = Config::load(Some(dir.path().join("absent.toml")));
        assert!(matches!(
            origin,
            ConfigOrigin::Defaults(ConfigError::Missing(_))
        ));
        assert_eq!(config.agent.poll_interval_ms, 2000);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\npoll_interval_ms = \"soon\"\n").unwrap();

        let (config, origin) = Config::load(Some(path));
        assert!(matches!(origin, ConfigOrigin::Defaults(ConfigError::Parse(..))));
        assert!(origin_message(&origin).contains("Failed to parse"));
        assert_eq!(config.agent.poll_interval_ms, 2000);
    }

    fn origin_message(origin: &ConfigOrigin) -> String {
        match origin {
            ConfigOrigin::File(path) => format!("{:?}", path),
            ConfigOrigin::Defaults(e) => e.to_string(),
        }
    }
}
