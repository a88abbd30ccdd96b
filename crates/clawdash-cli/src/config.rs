//! Client configuration at `~/.clawdash/config.toml`.
//!
//! Holds the gateway address, auth token and default peer. CLI flags always
//! override config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clawdash_client::{SessionConfig, DEFAULT_GATEWAY_URL};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// `[gateway]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway WebSocket address.
    #[serde(default = "default_url")]
    pub url: String,

    /// Auth token (empty = none).
    #[serde(default)]
    pub token: String,

    /// Default addressee for sends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: String::new(),
            peer: None,
            connect_timeout_secs: default_connect_timeout(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_call_timeout() -> u64 {
    30
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub gateway: Option<String>,
    pub token: Option<String>,
    pub peer: Option<String>,
}

impl Config {
    /// `~/.clawdash/config.toml`.
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_default();
        home.join(".clawdash").join("config.toml")
    }

    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Apply command-line overrides on top of the file values.
    pub fn merge(mut self, overrides: Overrides) -> Self {
        if let Some(url) = overrides.gateway {
            self.gateway.url = url;
        }
        if let Some(token) = overrides.token {
            self.gateway.token = token;
        }
        if let Some(peer) = overrides.peer {
            self.gateway.peer = Some(peer);
        }
        self
    }

    pub fn session_config(&self) -> SessionConfig {
        let gw = &self.gateway;
        SessionConfig {
            gateway_url: gw.url.clone(),
            auth_token: gw.token.clone(),
            peer: gw.peer.clone().filter(|p| !p.is_empty()),
            connect_timeout: Duration::from_secs(gw.connect_timeout_secs),
            call_timeout: Duration::from_secs(gw.call_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.gateway.url, "ws://localhost:18789");
        assert!(cfg.gateway.token.is_empty());
        assert!(cfg.gateway.peer.is_none());
        assert_eq!(cfg.gateway.call_timeout_secs, 30);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[gateway]
url = "wss://bridge.example.com/rpc"
token = "e33ec557"
peer = "+15550001111"
connect_timeout_secs = 3
call_timeout_secs = 5
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.gateway.url, "wss://bridge.example.com/rpc");
        assert_eq!(cfg.gateway.token, "e33ec557");
        assert_eq!(cfg.gateway.peer.as_deref(), Some("+15550001111"));

        let session = cfg.session_config();
        assert_eq!(session.connect_timeout, Duration::from_secs(3));
        assert_eq!(session.call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn parse_partial_toml_config() {
        let cfg: Config = toml::from_str("[gateway]\ntoken = \"t\"\n").unwrap();
        assert_eq!(cfg.gateway.url, "ws://localhost:18789"); // default
        assert_eq!(cfg.gateway.token, "t");
        assert_eq!(cfg.gateway.connect_timeout_secs, 10); // default
    }

    #[test]
    fn overrides_win() {
        let cfg: Config = toml::from_str("[gateway]\nurl = \"ws://a:1\"\ntoken = \"file\"\n").unwrap();
        let cfg = cfg.merge(Overrides {
            gateway: Some("ws://b:2".into()),
            token: None,
            peer: Some("+1".into()),
        });
        assert_eq!(cfg.gateway.url, "ws://b:2");
        assert_eq!(cfg.gateway.token, "file");
        assert_eq!(cfg.gateway.peer.as_deref(), Some("+1"));
    }

    #[test]
    fn empty_peer_means_none() {
        let cfg = Config::default().merge(Overrides {
            peer: Some(String::new()),
            ..Default::default()
        });
        assert!(cfg.session_config().peer.is_none());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config::default().merge(Overrides {
            gateway: Some("ws://10.0.0.2:18789".into()),
            token: Some("tok".into()),
            peer: Some("+15550001111".into()),
        });
        cfg.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), cfg);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gateway\nurl = 1").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
