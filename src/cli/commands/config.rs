//! Configuration management commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::cli::output::{print_formatted, OutputFormat};
use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Get a specific config value
    Get {
        /// Config key (e.g., "host.address", "events.page_size")
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., "host.address", "events.page_size")
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,
}

#[derive(Serialize)]
struct ConfigPathResult {
    path: String,
    exists: bool,
}

pub async fn run(command: ConfigCommands, format: OutputFormat, _quiet: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(format).await,
        ConfigCommands::Get { key } => get(&key, format).await,
        ConfigCommands::Set { key, value } => set(&key, &value).await,
        ConfigCommands::Path => path(format).await,
    }
}

async fn show(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            let toml = toml::to_string_pretty(&config)?;
            println!("{}", toml);
        }
    }

    Ok(())
}

async fn get(key: &str, format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let value = get_config_value(&config, key)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&value)?);
        }
        OutputFormat::Text => {
            println!("{}", value);
        }
    }

    Ok(())
}

fn get_config_value(config: &Config, key: &str) -> Result<String> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["host", "address"] => Ok(config.host.address.clone()),
        ["host", "connect_timeout_ms"] => Ok(config.host.connect_timeout_ms.to_string()),
        ["host", "request_timeout_ms"] => Ok(config.host.request_timeout_ms.to_string()),
        ["presence", "interval_secs"] => Ok(config.presence.interval_secs.to_string()),
        ["events", "tick_ms"] => Ok(config.events.tick_ms.to_string()),
        ["events", "notify_threshold_ms"] => Ok(config.events.notify_threshold_ms.to_string()),
        ["events", "page_size"] => Ok(config.events.page_size.to_string()),
        ["events", "sound_file"] => Ok(config
            .events
            .sound_file
            .clone()
            .unwrap_or_else(|| "<not set>".to_string())),
        ["events", "sound_volume"] => Ok(config.events.sound_volume.to_string()),
        ["storage", "path"] => Ok(config
            .storage
            .path
            .clone()
            .unwrap_or_else(|| "<default>".to_string())),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
}

async fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    set_config_value(&mut config, key, value)?;
    config.save()?;

    println!("Set {} = {}", key, value);
    Ok(())
}

/// Empty strings clear optional values
fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["host", "address"] => {
            config.host.address = value.to_string();
        }
        ["host", "connect_timeout_ms"] => {
            config.host.connect_timeout_ms = value.parse()?;
        }
        ["host", "request_timeout_ms"] => {
            config.host.request_timeout_ms = value.parse()?;
        }
        ["presence", "interval_secs"] => {
            config.presence.interval_secs = value.parse()?;
        }
        ["events", "tick_ms"] => {
            config.events.tick_ms = value.parse()?;
        }
        ["events", "notify_threshold_ms"] => {
            config.events.notify_threshold_ms = value.parse()?;
        }
        ["events", "page_size"] => {
            let size: usize = value.parse()?;
            if size == 0 {
                anyhow::bail!("events.page_size must be at least 1");
            }
            config.events.page_size = size;
        }
        ["events", "sound_file"] => {
            config.events.sound_file = optional(value);
        }
        ["events", "sound_volume"] => {
            let volume: f32 = value.parse()?;
            config.events.sound_volume = volume.clamp(0.0, 1.0);
        }
        ["storage", "path"] => {
            config.storage.path = optional(value);
        }
        _ => anyhow::bail!("Unknown or read-only config key: {}", key),
    }

    Ok(())
}

async fn path(format: OutputFormat) -> Result<()> {
    let path = Config::config_path()?;
    let exists = path.exists();

    let result = ConfigPathResult {
        path: path.to_string_lossy().to_string(),
        exists,
    };

    print_formatted(&result, format, |r| {
        format!("{}{}", r.path, if r.exists { "" } else { " (not found)" })
    });

    Ok(())
}
