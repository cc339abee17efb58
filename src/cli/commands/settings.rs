//! Launcher settings commands

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::app::LauncherApp;
use crate::cli::output::{on_off, print_formatted, print_success, OutputFormat};
use crate::model::{Resolution, Settings};

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show current settings
    Show,

    /// Replace settings with a JSON document
    Save {
        /// Settings as JSON (e.g. '{"language":"en","resolution":"1024x768"}')
        json: String,
    },

    /// Change the game resolution
    Resolution {
        /// Resolution as WIDTHxHEIGHT (e.g. 1920x1080)
        resolution: String,

        /// Run fullscreen instead of windowed
        #[arg(long)]
        fullscreen: bool,
    },
}

pub async fn run(
    command: SettingsCommands,
    app: &LauncherApp,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    match command {
        SettingsCommands::Show => show(app, format).await,
        SettingsCommands::Save { json } => save(app, &json, quiet).await,
        SettingsCommands::Resolution {
            resolution,
            fullscreen,
        } => resolution_cmd(app, &resolution, fullscreen, quiet).await,
    }
}

async fn show(app: &LauncherApp, format: OutputFormat) -> Result<()> {
    let settings = app.bridge().get_settings().await;
    print_formatted(&settings, format, format_settings_text);
    Ok(())
}

fn format_settings_text(s: &Settings) -> String {
    let mut lines = vec![
        format!("Language:    {}", s.language),
        format!("Resolution:  {}", s.resolution),
        format!("Window mode: {}", on_off(s.window_mode)),
        format!("Sound:       {}", on_off(s.sound)),
        format!("Music:       {}", on_off(s.music)),
    ];
    if let Some(server) = &s.server_name {
        lines.push(format!("Server:      {}", server));
    }
    if let Some(version) = &s.version {
        lines.push(format!("Version:     {}", version));
    }
    lines.join("\n")
}

async fn save(app: &LauncherApp, json: &str, quiet: bool) -> Result<()> {
    let settings: Settings = serde_json::from_str(json).context("Invalid settings JSON")?;
    settings.parsed_resolution()?;

    app.bridge().save_settings(&settings).await?;
    print_success("Settings saved", quiet);
    Ok(())
}

async fn resolution_cmd(app: &LauncherApp, value: &str, fullscreen: bool, quiet: bool) -> Result<()> {
    let resolution: Resolution = value.parse()?;
    app.bridge().set_resolution(resolution, !fullscreen).await;

    print_success(
        &format!(
            "Resolution set to {} ({})",
            resolution,
            if fullscreen { "fullscreen" } else { "windowed" }
        ),
        quiet,
    );
    Ok(())
}
