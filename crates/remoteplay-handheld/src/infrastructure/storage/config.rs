//! TOML-based configuration for the handheld application.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\RemotePlay\config.toml`
//! - Linux:    `~/.config/remoteplay/config.toml`
//! - macOS:    `~/Library/Application Support/RemotePlay/config.toml`
//!
//! An explicit path (the `--config` flag) bypasses the platform lookup.
//!
//! Example file:
//!
//! ```toml
//! [handheld]
//! log_level = "debug"
//! default_peer = "Desk-01"
//!
//! [link]
//! connect_timeout_ms = 5000
//!
//! [gesture]
//! double_tap_timeout_ms = 250
//!
//! [scheduler]
//! move_interval_ms = 30
//!
//! [[peers]]
//! name = "Desk-01"
//! address = "192.168.1.20:24810"
//! ```
//!
//! Every section and every field is optional.  Missing values fall back to
//! the `default_*` helpers below, so a first run without any file works.

use std::path::{Path, PathBuf};
use std::time::Duration;

use remoteplay_core::{GestureConfig, PeerHandle, SERIAL_PORT_SERVICE_ID};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level handheld configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub handheld: HandheldConfig,
    #[serde(default)]
    pub link: LinkSettings,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Bonded peers, standing in for the platform's paired-device list.
    #[serde(default)]
    pub peers: Vec<PeerHandle>,
}

/// General handheld behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandheldConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Name of the peer to connect to on start-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_peer: Option<String>,
}

/// Serial link parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkSettings {
    /// Upper bound on a single connect attempt.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Service identifier the peer listens on.
    #[serde(default = "default_service_id")]
    pub service_id: Uuid,
}

/// Send scheduler parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerSettings {
    /// Minimum spacing between two transmitted `MOVE` commands.
    #[serde(default = "default_move_interval_ms")]
    pub move_interval_ms: u64,
}

impl LinkSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl SchedulerSettings {
    pub fn move_interval(&self) -> Duration {
        Duration::from_millis(self.move_interval_ms)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_service_id() -> Uuid {
    SERIAL_PORT_SERVICE_ID
}
fn default_move_interval_ms() -> u64 {
    30
}

impl Default for HandheldConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_peer: None,
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            service_id: default_service_id(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            move_interval_ms: default_move_interval_ms(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the `RemotePlay` leaf.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("RemotePlay"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("remoteplay"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("RemotePlay")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("remoteplay_test_{}", Uuid::new_v4()))
            .join("config.toml")
    }

    #[test]
    fn test_app_config_default_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.handheld.log_level, "info");
        assert_eq!(cfg.handheld.default_peer, None);
        assert_eq!(cfg.link.connect_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.link.service_id, SERIAL_PORT_SERVICE_ID);
        assert_eq!(cfg.scheduler.move_interval(), Duration::from_millis(30));
        assert!(cfg.peers.is_empty());
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_sections_override_defaults() {
        // Arrange
        let toml_str = r#"
[handheld]
default_peer = "Desk-01"

[gesture]
double_tap_timeout_ms = 250

[[peers]]
name = "Desk-01"
address = "127.0.0.1:24810"
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.handheld.default_peer.as_deref(), Some("Desk-01"));
        assert_eq!(cfg.handheld.log_level, "info");
        assert_eq!(cfg.gesture.double_tap_timeout_ms, 250);
        assert_eq!(cfg.gesture.long_press_timeout_ms, 500);
        assert_eq!(cfg.peers, vec![PeerHandle::new("127.0.0.1:24810", "Desk-01")]);
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = temp_config_path();
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_config_from_malformed_file_returns_parse_error() {
        // Arrange
        let path = temp_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[link]\nconnect_timeout_ms = \"soon\"\n").unwrap();

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_save_then_load_config_round_trip() {
        // Arrange
        let path = temp_config_path();
        let mut cfg = AppConfig::default();
        cfg.handheld.log_level = "debug".to_string();
        cfg.scheduler.move_interval_ms = 45;
        cfg.peers.push(PeerHandle::new("00:11:22:33:44:55", "Desk-01"));

        // Act
        save_config_to(&cfg, &path).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
        // NoPlatformConfigDir is acceptable in a stripped environment.
    }
}
