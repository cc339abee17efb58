//! CLI module for the Lantern launcher
//!
//! Headless front end over the launcher core. Every command except
//! `config` connects to the host (or falls back to mock data) first.

mod commands;
mod output;
mod shell;

use clap::{Parser, Subcommand};

use crate::app::LauncherApp;
use crate::config::Config;
pub use output::OutputFormat;

/// Lantern - game launcher client
#[derive(Parser, Debug)]
#[command(name = "lantern")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[command(flatten)]
    pub output: OutputOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output formatting options
#[derive(Parser, Debug, Clone)]
pub struct OutputOptions {
    /// Output in JSON format (for machine parsing)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl OutputOptions {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the logged-in session
    Session,

    /// Show how many players are online
    Online,

    /// Launcher settings stored by the host
    Settings {
        #[command(subcommand)]
        command: commands::settings::SettingsCommands,
    },

    /// Launch and control the game client
    Game {
        #[command(subcommand)]
        command: commands::game::GameCommands,
    },

    /// Game clients the launcher did not start
    Process {
        #[command(subcommand)]
        command: commands::process::ProcessCommands,
    },

    /// Client update management
    Update {
        #[command(subcommand)]
        command: commands::update::UpdateCommands,
    },

    /// Event schedule and notifications
    Events {
        #[command(subcommand)]
        command: commands::events::EventsCommands,
    },

    /// Stay connected and print notifications, banners and host activity
    Watch,

    /// Interactive shell over a single host connection
    Shell,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },

    /// Ask the host to exit
    Exit,
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.output.format();
    let quiet = cli.output.quiet;

    // Config commands never touch the host
    let command = match cli.command {
        Commands::Config { command } => {
            return commands::config::run(command, format, quiet).await;
        }
        command => command,
    };

    let (mut app, status_rx) = LauncherApp::open(Config::load()?).await?;

    let result = match command {
        Commands::Watch => commands::watch::run(&mut app, status_rx, format, quiet).await,
        Commands::Shell => shell::run(&mut app, status_rx).await,
        command => dispatch(command, &app, format, quiet).await,
    };

    app.shutdown();
    result
}

/// Run a one-shot command against an open launcher
async fn dispatch(
    command: Commands,
    app: &LauncherApp,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match command {
        Commands::Session => commands::session::show(app, format).await,
        Commands::Online => commands::session::online(app, format).await,
        Commands::Settings { command } => commands::settings::run(command, app, format, quiet).await,
        Commands::Game { command } => commands::game::run(command, app, format, quiet).await,
        Commands::Process { command } => commands::process::run(command, app, format, quiet).await,
        Commands::Update { command } => commands::update::run(command, app, format, quiet).await,
        Commands::Events { command } => commands::events::run(command, app, format, quiet).await,
        Commands::Exit => commands::session::exit(app, quiet).await,
        Commands::Config { command } => commands::config::run(command, format, quiet).await,
        Commands::Watch | Commands::Shell => {
            anyhow::bail!("This command needs its own session")
        }
    }
}
