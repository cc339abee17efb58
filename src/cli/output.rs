//! Output formatting for CLI commands
//!
//! Results go to stdout (text or JSON); logs and errors go to stderr so
//! `--json` output can be piped straight into other tools.

use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::warn!("Failed to serialize output: {}", e),
    }
}

/// Print a command result as pretty JSON or through `text_formatter`
pub fn print_formatted<T, F>(value: &T, format: OutputFormat, text_formatter: F)
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Text => println!("{}", text_formatter(value)),
        OutputFormat::Json => print_json(value, true),
    }
}

/// Like [`print_formatted`] but one compact JSON object per line, for
/// streams such as `watch`
pub fn print_line<T, F>(value: &T, format: OutputFormat, text_formatter: F)
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Text => println!("{}", text_formatter(value)),
        OutputFormat::Json => print_json(value, false),
    }
}

/// Confirmation line, dropped with `--quiet`
pub fn print_success(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", message);
    }
}

pub fn print_error(message: &str) {
    eprintln!("Error: {}", message);
}

/// Outcome of a host action that only reports success or failure
pub fn print_status(ok: bool, action: &str) {
    if ok {
        println!("[OK] {}", action);
    } else {
        println!("[FAILED] {}", action);
    }
}

pub fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
