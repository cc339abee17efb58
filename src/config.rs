use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// How to reach the native host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host bridge address (host:port)
    #[serde(default = "default_address")]
    pub address: String,
    /// Give up on the handshake after this long and run in mock mode
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Per-request timeout once connected
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:47310".to_string()
}

fn default_connect_timeout() -> u64 {
    3_000
}

fn default_request_timeout() -> u64 {
    10_000
}

/// Online player count polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_presence_interval")]
    pub interval_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_presence_interval(),
        }
    }
}

fn default_presence_interval() -> u64 {
    30
}

/// Event countdowns and notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Countdown refresh cadence
    #[serde(default = "default_tick")]
    pub tick_ms: u64,
    /// Lead time before an event start at which a notification may fire
    #[serde(default = "default_threshold")]
    pub notify_threshold_ms: i64,
    /// Events per page on the schedule board
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Sound file for notifications (terminal bell when unset)
    #[serde(default)]
    pub sound_file: Option<String>,
    #[serde(default = "default_volume")]
    pub sound_volume: f32,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick(),
            notify_threshold_ms: default_threshold(),
            page_size: default_page_size(),
            sound_file: None,
            sound_volume: default_volume(),
        }
    }
}

fn default_tick() -> u64 {
    1_000
}

fn default_threshold() -> i64 {
    60_000
}

fn default_page_size() -> usize {
    7
}

fn default_volume() -> f32 {
    0.75
}

/// Local storage location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file (defaults to the platform data directory)
    #[serde(default)]
    pub path: Option<String>,
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "lantern", "Lantern")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Get the platform data directory
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.to_path_buf())
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a file, falling back to defaults if missing
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
