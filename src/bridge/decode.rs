//! Decode-or-default boundary for host payloads.
//!
//! The host sometimes returns JSON-encoded strings and sometimes plain JSON
//! values for the same call. Each payload kind gets exactly one function here
//! that accepts either shape. A failure is logged and reported as "no data";
//! callers pick their own fallback.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::BridgeError;
use crate::model::{LaunchResult, LauncherEvent, Session, Settings, UnmanagedProcess};

/// Unwrap a string-encoded JSON payload, leaving other values untouched
fn unwrap_string(kind: &'static str, raw: Value) -> Result<Value, BridgeError> {
    match raw {
        Value::String(text) => {
            serde_json::from_str(&text).map_err(|source| BridgeError::Decode { kind, source })
        }
        other => Ok(other),
    }
}

/// Decode a payload of any deserialisable kind
pub fn payload<T: DeserializeOwned>(kind: &'static str, raw: Value) -> Result<T, BridgeError> {
    let value = unwrap_string(kind, raw)?;
    serde_json::from_value(value).map_err(|source| BridgeError::Decode { kind, source })
}

fn or_log<T>(result: Result<T, BridgeError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring host payload: {}", e);
            None
        }
    }
}

/// Decode a list, skipping malformed entries rather than the whole list.
/// `None` when the payload itself is not a list.
fn try_list<T: DeserializeOwned>(kind: &'static str, raw: Value) -> Option<Vec<T>> {
    let items = match or_log(unwrap_string(kind, raw))? {
        Value::Array(items) => items,
        other => {
            tracing::warn!("Ignoring host payload: {} is not a list ({})", kind, other);
            return None;
        }
    };

    Some(
        items
            .into_iter()
            .filter_map(|item| or_log(payload(kind, item)))
            .collect(),
    )
}

fn list<T: DeserializeOwned>(kind: &'static str, raw: Value) -> Vec<T> {
    if raw.is_null() {
        return Vec::new();
    }
    try_list(kind, raw).unwrap_or_default()
}

pub fn settings(raw: Value) -> Option<Settings> {
    or_log(payload("settings", raw))
}

pub fn session(raw: Value) -> Option<Session> {
    or_log(payload("session", raw))
}

pub fn launch_result(raw: Value) -> Option<LaunchResult> {
    or_log(payload("launch result", raw))
}

pub fn events(raw: Value) -> Vec<LauncherEvent> {
    list("events", raw)
}

/// A pushed replacement list. Unlike [`events`], a payload that is not a
/// list at all yields `None` so it cannot be mistaken for an empty schedule.
pub fn event_list(raw: Value) -> Option<Vec<LauncherEvent>> {
    try_list("events", raw)
}

pub fn processes(raw: Value) -> Vec<UnmanagedProcess> {
    list("processes", raw)
}

pub fn process(raw: Value) -> Option<UnmanagedProcess> {
    or_log(payload("process", raw))
}

/// Boolean results; the host may answer `true`, `"true"` or `1`
pub fn flag(raw: Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => or_log(payload("flag", Value::String(s))),
        other => {
            tracing::warn!("Ignoring host payload: expected a flag, got {}", other);
            None
        }
    }
}

/// Non-negative counts; negative or fractional values are rejected
pub fn count(raw: Value) -> Option<u32> {
    let value = or_log(unwrap_string("count", raw))?;
    match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
        Some(n) => Some(n),
        None => {
            tracing::warn!("Ignoring host payload: expected a count, got {}", value);
            None
        }
    }
}

/// Progress percentage, clamped to 0..=100
pub fn percent(raw: Value) -> Option<u8> {
    let value = or_log(unwrap_string("percent", raw))?;
    match value.as_f64() {
        Some(p) => Some(p.clamp(0.0, 100.0).round() as u8),
        None => {
            tracing::warn!("Ignoring host payload: expected a percentage, got {}", value);
            None
        }
    }
}

/// Plain text arguments; non-string values are rendered as JSON
pub fn text(raw: Value) -> String {
    match raw {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
