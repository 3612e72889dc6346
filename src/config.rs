//! Application configuration
//!
//! Loaded from `config.toml` in the platform config directory when present,
//! otherwise every section falls back to defaults matching the demo setup
//! (port 8080, 5 s track toggle, 3 s keyframe requests, `output.ivf`).

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::SignalingMode;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub playback: PlaybackConfig,
}

/// HTTP/WebSocket listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: crate::constants::DEFAULT_HTTP_PORT,
        }
    }
}

/// Per-session negotiation and relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inbound signaling dispatch mode
    pub mode: SignalingMode,
    /// Seconds between periodic add/remove track toggles
    pub toggle_interval_secs: u64,
    /// Seconds between keyframe requests on relayed tracks
    pub pli_interval_secs: u64,
    /// STUN server URLs handed to the engine; empty means host candidates only
    pub stun_servers: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SignalingMode::OneWay,
            toggle_interval_secs: crate::constants::TOGGLE_INTERVAL_SECS,
            pli_interval_secs: crate::constants::PLI_INTERVAL_SECS,
            stun_servers: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn toggle_interval(&self) -> Duration {
        Duration::from_secs(self.toggle_interval_secs)
    }

    pub fn pli_interval(&self) -> Duration {
        Duration::from_secs(self.pli_interval_secs)
    }
}

/// File playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Path to the IVF video file streamed to the peer
    pub file: PathBuf,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(crate::constants::DEFAULT_VIDEO_FILE),
        }
    }
}

impl AppConfig {
    /// Load the configuration file, or defaults when it does not exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path)?;
                let config = toml::from_str(&text)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                tracing::info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            _ => Ok(Self::default()),
        }
    }

    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "rtc-relay").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_setup() {
        let config = AppConfig::default();
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.session.toggle_interval(), Duration::from_secs(5));
        assert_eq!(config.session.pli_interval(), Duration::from_secs(3));
        assert_eq!(config.playback.file, PathBuf::from("output.ivf"));
        assert!(config.session.stun_servers.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            http_port = 9090

            [session]
            mode = "bidirectional"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.http_port, 9090);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.session.mode, SignalingMode::Bidirectional);
        assert_eq!(config.session.toggle_interval_secs, 5);
    }
}
