//! RoomShare terminal client entry point.

mod app;
mod cli;
mod config;
mod display;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Logs go to stderr so stdout stays readable for chat.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting RoomShare");

    let mut config = config::Config::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    tracing::info!(server = %config.server_url, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(cli.command, config))?;

    tracing::info!("exiting");
    Ok(())
}
