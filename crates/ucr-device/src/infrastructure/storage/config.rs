//! TOML-based configuration for the device binary.
//!
//! The config file is looked up in this order:
//! 1. the first command-line argument,
//! 2. the `UCR_CONFIG` environment variable,
//! 3. `ucr-device.toml` in the working directory.
//!
//! A missing file is not an error: the device starts with defaults and no
//! channels, which still answers heartbeats and descriptor requests.
//!
//! `ucr-device --write-default-config [PATH]` writes the default config to
//! `PATH` (resolved the same way) and exits, as a starting point for editing.
//!
//! ```toml
//! [device]
//! hostname = "garage-panel"
//! log_level = "info"
//!
//! [network]
//! bind_address = "0.0.0.0"
//! port = 8080
//!
//! [timing]
//! push_interval_ms = 20
//!
//! [[channels]]
//! direction = "input"
//! category = "button"
//! name = "door"
//! index = 0
//! ```
//!
//! # Serde default values
//!
//! Every field has a `#[serde(default = ...)]` helper, so a file only needs
//! the settings it changes.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ucr_core::engine::config::{
    DEFAULT_PUSH_INTERVAL, DEFAULT_RECEIVE_BUFFER_SIZE, DEFAULT_SUBSCRIBER_TIMEOUT,
};
use ucr_core::protocol::DEFAULT_PORT;
use ucr_core::{Category, Direction};

/// Environment variable naming the config file when no argument is given.
pub const CONFIG_ENV_VAR: &str = "UCR_CONFIG";

/// File name used when neither an argument nor the environment names one.
pub const DEFAULT_CONFIG_FILE: &str = "ucr-device.toml";

/// Command-line flag that writes the default config instead of running.
pub const WRITE_DEFAULT_FLAG: &str = "--write-default-config";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
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

    /// A `[[channels]]` entry cannot be registered.
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    /// `network.bind_address` is not an IP address.
    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

/// Identity and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    /// Name reported to peers.  Absent means `UCR_` plus a random id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// UDP socket settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Datagrams longer than this are truncated and fail to decode.
    #[serde(default = "default_receive_buffer_size")]
    pub receive_buffer_size: usize,
}

/// Scheduling settings, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    /// How often the engine is ticked.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Interval between unconditional subscriber pushes.
    #[serde(default = "default_push_interval_ms")]
    pub push_interval_ms: u64,
    /// Silence after which the subscriber is dropped.
    #[serde(default = "default_subscriber_timeout_ms")]
    pub subscriber_timeout_ms: u64,
}

/// One channel the device exposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelEntry {
    pub direction: Direction,
    pub category: Category,
    pub name: String,
    /// Wire index.  Absent means the lowest free index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_receive_buffer_size() -> usize {
    DEFAULT_RECEIVE_BUFFER_SIZE
}
fn default_tick_interval_ms() -> u64 {
    1
}
fn default_push_interval_ms() -> u64 {
    DEFAULT_PUSH_INTERVAL.as_millis() as u64
}
fn default_subscriber_timeout_ms() -> u64 {
    DEFAULT_SUBSCRIBER_TIMEOUT.as_millis() as u64
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            hostname: None,
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            receive_buffer_size: default_receive_buffer_size(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            push_interval_ms: default_push_interval_ms(),
            subscriber_timeout_ms: default_subscriber_timeout_ms(),
        }
    }
}

impl NetworkConfig {
    /// The address the UDP socket binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `bind_address` is not an IP.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl TimingConfig {
    /// Tick period; zero is raised to one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_millis(self.push_interval_ms)
    }

    pub fn subscriber_timeout(&self) -> Duration {
        Duration::from_millis(self.subscriber_timeout_ms)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Picks the config path from a command-line argument, then an environment
/// value, then the default file name.
pub fn resolve_config_path(cli_arg: Option<String>, env_value: Option<String>) -> PathBuf {
    cli_arg
        .or(env_value)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load the config at this path and run the device.
    Run(PathBuf),
    /// Write `DeviceConfig::default()` to this path and exit.
    WriteDefaultConfig(PathBuf),
}

/// Interprets the command-line arguments (program name excluded).
pub fn parse_command<I>(args: I, env_value: Option<String>) -> Command
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    match args.next() {
        Some(flag) if flag == WRITE_DEFAULT_FLAG => {
            Command::WriteDefaultConfig(resolve_config_path(args.next(), env_value))
        }
        first => Command::Run(resolve_config_path(first, env_value)),
    }
}

/// Parses the command for this process.
pub fn command_from_env() -> Command {
    parse_command(std::env::args().skip(1), std::env::var(CONFIG_ENV_VAR).ok())
}

/// Loads `DeviceConfig` from `path`, returning `DeviceConfig::default()` if
/// the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<DeviceConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: DeviceConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DeviceConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &DeviceConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
