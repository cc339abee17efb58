//! Update management commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::app::LauncherApp;
use crate::cli::output::{print_error, print_formatted, print_success, OutputFormat};
use crate::update::{UpdateState, UpdateStatus};

#[derive(Subcommand, Debug)]
pub enum UpdateCommands {
    /// Ask the host whether an update is available
    Check,

    /// Check, then download and install the update, following progress
    Start,

    /// Cancel a running download
    Cancel,
}

#[derive(Serialize)]
struct UpdateResult {
    status: String,
    version: Option<String>,
    progress: u8,
    error: Option<String>,
}

impl From<&UpdateState> for UpdateResult {
    fn from(state: &UpdateState) -> Self {
        Self {
            status: format!("{:?}", state.status),
            version: state.version.clone(),
            progress: state.progress,
            error: state.error.clone(),
        }
    }
}

pub async fn run(
    command: UpdateCommands,
    app: &LauncherApp,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    match command {
        UpdateCommands::Check => check(app, format).await,
        UpdateCommands::Start => start(app, format, quiet).await,
        UpdateCommands::Cancel => {
            app.bridge().cancel_update().await;
            print_success("Cancel requested", quiet);
            Ok(())
        }
    }
}

fn format_state_text(r: &UpdateResult, state: &UpdateState) -> String {
    match (state.status, &r.version) {
        (UpdateStatus::UpdateAvailable, Some(v)) => format!("Update available: {}", v),
        (UpdateStatus::Error, _) => format!(
            "{}: {}",
            state.status.description(),
            r.error.as_deref().unwrap_or("unknown error")
        ),
        _ => state.status.description().to_string(),
    }
}

async fn check(app: &LauncherApp, format: OutputFormat) -> Result<()> {
    let updates = app.updates();
    if let Err(e) = updates.check_for_updates().await {
        print_error(&e.to_string());
    }

    let state = updates.state();
    let result = UpdateResult::from(&state);
    print_formatted(&result, format, |r| format_state_text(r, &state));
    Ok(())
}

async fn start(app: &LauncherApp, format: OutputFormat, quiet: bool) -> Result<()> {
    let updates = app.updates();
    let mut rx = updates.subscribe();

    updates.check_for_updates().await?;
    if let Err(e) = updates.start_update().await {
        let state = updates.state();
        print_formatted(&UpdateResult::from(&state), format, |r| format_state_text(r, &state));
        return Err(e.into());
    }

    let mut last_progress = None;
    loop {
        let state = rx.borrow_and_update().clone();
        match state.status {
            UpdateStatus::Downloading => {
                if !quiet && last_progress != Some(state.progress) {
                    eprintln!("Downloading... {}%", state.progress);
                    last_progress = Some(state.progress);
                }
            }
            UpdateStatus::Finished => {
                print_formatted(&UpdateResult::from(&state), format, |r| {
                    format_state_text(r, &state)
                });
                return Ok(());
            }
            _ => {
                let message = state.error.clone().unwrap_or_else(|| "Update stopped".to_string());
                print_formatted(&UpdateResult::from(&state), format, |r| {
                    format_state_text(r, &state)
                });
                anyhow::bail!(message);
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    anyhow::bail!("Update controller stopped");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                updates.cancel_update().await?;
                print_success("Update cancelled", quiet);
                return Ok(());
            }
        }
    }
}
