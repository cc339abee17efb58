mod app;
mod bridge;
mod cli;
mod config;
mod db;
mod events;
mod model;
mod presence;
mod task;
mod update;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_filter = if cli.output.verbose {
        "lantern=trace,debug"
    } else {
        "lantern=debug,info"
    };

    // Logs go to stderr so command output stays parseable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting Lantern {}", env!("CARGO_PKG_VERSION"));

    cli::run(cli).await
}
