//! CLI subcommands

pub mod config;
pub mod events;
pub mod game;
pub mod process;
pub mod session;
pub mod settings;
pub mod update;
pub mod watch;
