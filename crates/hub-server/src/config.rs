//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (HUB_HOST, HUB_PORT)
//! - TOML configuration file

use anyhow::{Context, Result};
use royale_hub_core::{GameConfig, HubConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Heartbeat configuration.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Hub behaviour.
    #[serde(default)]
    pub hub: HubSection,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Path for the overlay WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub websocket_path: String,

    /// Path the livestream connector posts events to.
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of overlay subscribers.
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,

    /// Notifications buffered per subscriber before it is dropped.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// Maximum inbound event size in bytes.
    #[serde(default = "default_max_event_size")]
    pub max_event_size: usize,
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Ping interval in milliseconds.
    #[serde(default = "default_heartbeat_interval")]
    pub interval_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Hub configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSection {
    /// Prefix that turns chat into a command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: char,

    /// Event log capacity, clamped to 1..=200 by the store.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Game tables file. Built-in tables are used when unset.
    #[serde(default)]
    pub game_config: Option<PathBuf>,
}

// Default value functions
fn default_host() -> String {
    std::env::var("HUB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("HUB_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000)
}

fn default_true() -> bool {
    true
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_webhook_path() -> String {
    "/tiktok/event".to_string()
}

fn default_max_subscribers() -> usize {
    10_000
}

fn default_subscriber_buffer() -> usize {
    1024
}

fn default_max_event_size() -> usize {
    64 * 1024 // 64 KB
}

fn default_heartbeat_interval() -> u64 {
    30_000 // 30 seconds
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_command_prefix() -> char {
    '!'
}

fn default_log_capacity() -> usize {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            transport: TransportConfig::default(),
            limits: LimitsConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            metrics: MetricsConfig::default(),
            hub: HubSection::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            websocket_path: default_ws_path(),
            webhook_path: default_webhook_path(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_subscribers: default_max_subscribers(),
            subscriber_buffer: default_subscriber_buffer(),
            max_event_size: default_max_event_size(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_heartbeat_interval(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            log_capacity: default_log_capacity(),
            game_config: None,
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        // Try to load from default paths
        let config_paths = [
            "royale-hub.toml",
            "/etc/royale-hub/royale-hub.toml",
            "~/.config/royale-hub/royale-hub.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid host:port {}:{}", self.host, self.port))
    }

    /// Hub settings derived from this configuration.
    #[must_use]
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            command_prefix: self.hub.command_prefix,
            log_capacity: self.hub.log_capacity.max(1),
            subscriber_buffer: self.limits.subscriber_buffer,
            max_subscribers: self.limits.max_subscribers,
        }
    }

    /// Load the game tables, from file if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured file is unreadable or invalid.
    pub fn game_config(&self) -> Result<GameConfig> {
        match &self.hub.game_config {
            Some(path) => {
                let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
                GameConfig::from_file(&expanded)
                    .with_context(|| format!("Failed to load game tables: {expanded}"))
            }
            None => Ok(GameConfig::default()),
        }
    }
}
