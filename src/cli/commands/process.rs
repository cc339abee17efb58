//! Unmanaged game client commands

use anyhow::Result;
use clap::Subcommand;

use crate::app::LauncherApp;
use crate::cli::output::{print_formatted, print_status, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum ProcessCommands {
    /// List game clients not started by the launcher
    List,

    /// Terminate an unmanaged game client
    Kill {
        /// Process id
        pid: u32,
    },
}

pub async fn run(
    command: ProcessCommands,
    app: &LauncherApp,
    format: OutputFormat,
    _quiet: bool,
) -> Result<()> {
    match command {
        ProcessCommands::List => {
            let processes = app.bridge().get_unmanaged_processes().await;
            print_formatted(&processes, format, |list| {
                if list.is_empty() {
                    return "No unmanaged game clients".to_string();
                }
                list.iter()
                    .map(|p| format!("{:>8}  {}", p.pid, p.name))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            Ok(())
        }
        ProcessCommands::Kill { pid } => {
            let ok = app.bridge().kill_unmanaged_process(pid).await;
            print_status(ok, &format!("Kill process {}", pid));
            if !ok {
                anyhow::bail!("Host did not terminate process {}", pid);
            }
            Ok(())
        }
    }
}
