//! Interactive shell mode for the Lantern CLI
//!
//! Keeps one host connection open across commands. Background activity
//! (notifications, update banners, online count) is printed as it arrives.

use anyhow::Result;
use clap::Parser;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Config, Editor, Helper};
use tokio::sync::mpsc;

use super::commands::watch;
use super::{dispatch, Cli, Commands};
use crate::app::{LauncherApp, StatusEvent};
use crate::task::TaskGuard;

const COMMANDS: &[(&str, &[&str])] = &[
    ("session", &[]),
    ("online", &[]),
    ("settings", &["show", "save", "resolution"]),
    ("game", &["launch", "front", "close", "drag"]),
    ("process", &["list", "kill"]),
    ("update", &["check", "start", "cancel"]),
    (
        "events",
        &[
            "list",
            "next",
            "prev",
            "mute",
            "unmute",
            "mute-all",
            "unmute-all",
            "reset-notified",
        ],
    ),
    ("config", &["show", "get", "set", "path"]),
    ("help", &[]),
    ("exit", &[]),
    ("quit", &[]),
];

/// Completes command and subcommand names
struct ShellCompleter;

fn pairs<'a>(names: impl Iterator<Item = &'a str>) -> Vec<Pair> {
    names
        .map(|name| Pair {
            display: name.to_string(),
            replacement: name.to_string(),
        })
        .collect()
}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let words: Vec<&str> = line.split_whitespace().collect();
        let typing = !line.ends_with(' ');
        let start = line.rfind(' ').map(|i| i + 1).unwrap_or(0);

        let candidates = match (words.as_slice(), typing) {
            ([], _) => pairs(COMMANDS.iter().map(|(cmd, _)| *cmd)),
            ([prefix], true) => pairs(
                COMMANDS
                    .iter()
                    .map(|(cmd, _)| *cmd)
                    .filter(|cmd| cmd.starts_with(prefix)),
            ),
            ([cmd], false) => subcommands(cmd)
                .map(|subs| pairs(subs.iter().copied()))
                .unwrap_or_default(),
            ([cmd, prefix], true) => subcommands(cmd)
                .map(|subs| pairs(subs.iter().copied().filter(|s| s.starts_with(prefix))))
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        Ok((if typing { start } else { pos }, candidates))
    }
}

fn subcommands(cmd: &str) -> Option<&'static [&'static str]> {
    COMMANDS.iter().find(|(c, _)| *c == cmd).map(|(_, subs)| *subs)
}

impl Hinter for ShellCompleter {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellCompleter {}
impl Validator for ShellCompleter {}
impl Helper for ShellCompleter {}

/// Split a command line into arguments, honouring single and double quotes
fn parse_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ' ') => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }
    args
}

/// Run one shell line. Returns Ok(false) when the shell should exit.
async fn run_command(args: Vec<String>, app: &LauncherApp) -> Result<bool> {
    let Some(first) = args.first() else {
        return Ok(true);
    };

    match first.as_str() {
        "help" => {
            print_help();
            return Ok(true);
        }
        "exit" | "quit" => return Ok(false),
        _ => {}
    }

    let argv = std::iter::once("lantern".to_string()).chain(args);
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(e) => {
            println!("{}", e);
            return Ok(true);
        }
    };

    if matches!(cli.command, Commands::Shell | Commands::Watch) {
        println!("Already streaming launcher activity in shell mode.");
        return Ok(true);
    }

    let format = cli.output.format();
    let quiet = cli.output.quiet;
    dispatch(cli.command, app, format, quiet).await?;
    Ok(true)
}

fn print_help() {
    println!(
        r#"Lantern Interactive Shell

Commands:
  session                          Show the logged-in session
  online                           Show how many players are online

  settings show                    Show launcher settings
  settings save <json>             Replace settings
  settings resolution <WxH>        Change resolution [--fullscreen]

  game launch                      Launch the game client
  game front                       Bring the game window to the front
  game close                       Close the game client
  game drag <x> <y>                Start dragging the launcher window

  process list                     List unmanaged game clients
  process kill <pid>               Terminate an unmanaged client

  update check                     Ask the host for an update
  update start                     Download and install the update
  update cancel                    Cancel a running download

  events list                      Event board [--category <c> | --all] [--page <n>]
  events next|prev                 Move between board pages
  events mute <id>                 Mute notifications for one event
  events unmute <id>               Unmute one event
  events mute-all                  Mute every notification
  events unmute-all                Lift the global mute
  events reset-notified            Let announced events notify again

  config show|get|set|path         Configuration management

  help                             Show this help
  exit, quit                       Leave the shell (the host keeps running)

Flags (can be added to any command):
  --json                           Output in JSON format
  --quiet, -q                      Suppress non-essential output
"#
    );
}

/// Get the history file path
fn history_path() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("com", "lantern", "Lantern")
        .map(|dirs| dirs.data_dir().join("shell_history"))
}

/// Run the interactive shell
pub async fn run(app: &mut LauncherApp, mut status_rx: mpsc::UnboundedReceiver<StatusEvent>) -> Result<()> {
    println!("Lantern Interactive Shell v{}", env!("CARGO_PKG_VERSION"));
    if !app.bridge().is_connected() {
        println!("No native host found; using mock data.");
    }
    println!("Type 'help' for available commands, 'exit' to quit.\n");

    app.start_background();
    let _printer = TaskGuard::spawn("shell status printer", async move {
        while let Some(event) = status_rx.recv().await {
            println!("{}", watch::to_text(&event));
        }
    });

    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(ShellCompleter));

    if let Some(path) = history_path() {
        let _ = rl.load_history(&path);
    }

    loop {
        match rl.readline("lantern> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                match run_command(parse_args(line), app).await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(path) = history_path() {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.save_history(&path);
    }

    Ok(())
}
