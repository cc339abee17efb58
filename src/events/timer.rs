//! Countdown values derived from an event's start time.

use chrono::{DateTime, Utc};

use crate::model::LauncherEvent;

/// Countdown for one event at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTimer {
    pub remaining_ms: i64,
    pub formatted: String,
    pub has_started: bool,
}

impl EventTimer {
    pub fn at(event: &LauncherEvent, now: DateTime<Utc>) -> Self {
        let remaining_ms = event.remaining_ms(now);
        Self {
            remaining_ms,
            formatted: format_remaining(remaining_ms),
            has_started: remaining_ms <= 0,
        }
    }
}

/// Render a countdown as `"1h 2m 5s"`, `"1m 5s"` or `"5s"`, dropping leading
/// zero units. Anything at or below zero is `"Started"`.
pub fn format_remaining(remaining_ms: i64) -> String {
    if remaining_ms <= 0 {
        return "Started".to_string();
    }

    let total_secs = remaining_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
