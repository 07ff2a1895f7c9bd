//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_SOCKET_URL: &str = "http://localhost:5000";
const DEFAULT_SOCKET_PATH: &str = "/socket.io/";
const DEFAULT_MAX_BACKOFF_SECS: u64 = 64;
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 20;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// REST base URL (identity, roster and history endpoints live below it)
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Origin of the real-time message relay
    #[serde(default = "default_socket_url")]
    pub socket_url: String,
    /// Bearer token sent with every REST request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Real-time channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Socket.IO endpoint path on the relay origin
    #[serde(default = "default_socket_path")]
    pub path: String,
    #[serde(default)]
    pub transport: Transport,
    /// Reconnect with exponential backoff after a dropped connection
    #[serde(default = "default_true")]
    pub reconnect: bool,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Limit on connecting plus the Engine.IO/Socket.IO handshake and join
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

/// Transport preference for the relay connection.
///
/// Only the WebSocket transport is spoken; long-polling is never attempted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Websocket,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Websocket => "websocket",
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_socket_url() -> String {
    DEFAULT_SOCKET_URL.to_string()
}

fn default_socket_path() -> String {
    DEFAULT_SOCKET_PATH.to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_backoff_secs() -> u64 {
    DEFAULT_MAX_BACKOFF_SECS
}

fn default_handshake_timeout_secs() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            socket_url: default_socket_url(),
            token: None,
            relay: RelayConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            path: default_socket_path(),
            transport: Transport::default(),
            reconnect: true,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
            handshake_timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "admin-chat", "admin-chat")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config file")?;
        anyhow::ensure!(
            config.relay.max_backoff_secs > 0,
            "relay.max_backoff_secs must be at least 1"
        );
        anyhow::ensure!(
            config.relay.handshake_timeout_secs > 0,
            "relay.handshake_timeout_secs must be at least 1"
        );
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains tokens)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Token with all but the last four characters hidden.
    pub fn masked_token(&self) -> Option<String> {
        self.token.as_deref().map(|t| {
            let visible: String = t
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("****{}", visible)
        })
    }
}

/// Store backend URLs and an access token.
pub fn login(token: Option<String>, api_url: Option<String>, socket_url: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = api_url {
        config.api_url = url;
    }
    if let Some(url) = socket_url {
        config.socket_url = url;
    }
    if token.is_some() {
        config.token = token;
    }
    config.save()?;
    tracing::info!("Configuration saved to {}", Config::path()?.display());
    Ok(())
}

/// Forget the stored access token.
pub fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.token = None;
    config.save()?;
    println!("Token cleared.");
    Ok(())
}

/// Print the effective configuration.
pub fn status() -> Result<()> {
    let config = Config::load()?;
    println!("Config file: {}", Config::path()?.display());
    println!("API URL:     {}", config.api_url);
    println!(
        "Relay:       {}{} ({})",
        config.socket_url.trim_end_matches('/'),
        config.relay.path,
        config.relay.transport.as_str()
    );
    println!(
        "Reconnect:   {} (max backoff {}s)",
        if config.relay.reconnect { "yes" } else { "no" },
        config.relay.max_backoff_secs
    );
    println!(
        "Token:       {}",
        config.masked_token().as_deref().unwrap_or("(none)")
    );
    Ok(())
}
