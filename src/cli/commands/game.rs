//! Game launching and window commands

use anyhow::Result;
use clap::Subcommand;

use crate::app::LauncherApp;
use crate::cli::output::{print_error, print_formatted, print_status, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum GameCommands {
    /// Launch the game client
    Launch,

    /// Bring the running game window to the front
    Front,

    /// Close the running game client
    Close,

    /// Start dragging the launcher window from a screen position
    Drag {
        x: i32,
        y: i32,
    },
}

pub async fn run(
    command: GameCommands,
    app: &LauncherApp,
    format: OutputFormat,
    _quiet: bool,
) -> Result<()> {
    match command {
        GameCommands::Launch => launch(app, format).await,
        GameCommands::Front => {
            let ok = app.bridge().bring_game_to_front().await;
            print_status(ok, "Bring game to front");
            Ok(())
        }
        GameCommands::Close => {
            let ok = app.bridge().close_game().await;
            print_status(ok, "Close game");
            Ok(())
        }
        GameCommands::Drag { x, y } => {
            app.bridge().start_drag(x, y).await;
            Ok(())
        }
    }
}

async fn launch(app: &LauncherApp, format: OutputFormat) -> Result<()> {
    let result = app.bridge().launch_game().await;

    print_formatted(&result, format, |r| {
        if r.success {
            format!("Game launched. {}", r.message)
        } else {
            format!("Launch failed: {}", r.message)
        }
    });

    if !result.success {
        print_error(&result.message);
        anyhow::bail!("Game launch failed");
    }
    Ok(())
}
