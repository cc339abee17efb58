//! Data types exchanged with the host.
//!
//! Everything here crosses the bridge as JSON. Field names follow the host's
//! snake_case convention, except `LauncherEvent::next_start` which the host
//! publishes as `nextStart`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Login session reported by the host at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub logged: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Launcher settings as stored by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_resolution")]
    pub resolution: String,
    #[serde(default = "default_true")]
    pub window_mode: bool,
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default = "default_true")]
    pub music: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_executable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_clients: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_unmanaged_clients: Option<bool>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_resolution() -> String {
    Resolution::R1366x768.to_string()
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Parse the stored resolution against the supported list
    pub fn parsed_resolution(&self) -> Result<Resolution, InvalidResolution> {
        self.resolution.parse()
    }
}

/// Returned when a resolution is not in [`Resolution::ALL`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported resolution: {0}")]
pub struct InvalidResolution(pub String);

/// Screen resolutions the game client supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    R640x480,
    R800x600,
    R1024x768,
    R1280x1024,
    R1366x768,
    R1440x900,
    R1600x900,
    R1680x1050,
    R1920x1080,
}

impl Resolution {
    pub const ALL: [Resolution; 9] = [
        Resolution::R640x480,
        Resolution::R800x600,
        Resolution::R1024x768,
        Resolution::R1280x1024,
        Resolution::R1366x768,
        Resolution::R1440x900,
        Resolution::R1600x900,
        Resolution::R1680x1050,
        Resolution::R1920x1080,
    ];

    /// Width and height in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::R640x480 => (640, 480),
            Resolution::R800x600 => (800, 600),
            Resolution::R1024x768 => (1024, 768),
            Resolution::R1280x1024 => (1280, 1024),
            Resolution::R1366x768 => (1366, 768),
            Resolution::R1440x900 => (1440, 900),
            Resolution::R1600x900 => (1600, 900),
            Resolution::R1680x1050 => (1680, 1050),
            Resolution::R1920x1080 => (1920, 1080),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{}x{}", w, h)
    }
}

impl FromStr for Resolution {
    type Err = InvalidResolution;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Resolution::ALL
            .into_iter()
            .find(|r| r.to_string() == trimmed)
            .ok_or_else(|| InvalidResolution(trimmed.to_string()))
    }
}

/// Outcome of a game launch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl LaunchResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A game client process the launcher did not start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmanagedProcess {
    pub pid: u32,
    #[serde(default)]
    pub name: String,
}

/// Front-end views the host can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Home,
    Rankings,
    Donate,
    Guides,
    Events,
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Tab::Home),
            "rankings" => Ok(Tab::Rankings),
            "donate" => Ok(Tab::Donate),
            "guides" => Ok(Tab::Guides),
            "events" => Ok(Tab::Events),
            other => Err(format!("Unknown view: {}", other)),
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tab::Home => "home",
            Tab::Rankings => "rankings",
            Tab::Donate => "donate",
            Tab::Guides => "guides",
            Tab::Events => "events",
        };
        f.write_str(name)
    }
}

/// Event grouping used for filtering the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Events,
    Invasions,
    Bosses,
    Others,
}

impl EventCategory {
    pub const ALL: [EventCategory; 4] = [
        EventCategory::Events,
        EventCategory::Invasions,
        EventCategory::Bosses,
        EventCategory::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Events => "events",
            EventCategory::Invasions => "invasions",
            EventCategory::Bosses => "bosses",
            EventCategory::Others => "others",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown event category: {}", s))
    }
}

/// A scheduled in-game event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherEvent {
    pub id: String,
    pub name: String,
    pub category: EventCategory,
    #[serde(rename = "nextStart")]
    pub next_start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LauncherEvent {
    /// Milliseconds until the event starts (negative once started)
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.next_start - now).num_milliseconds()
    }
}
