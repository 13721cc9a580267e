mod cli;
mod driver;
mod log_tailer;
mod scheduler;
mod script;
mod utils;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the streamed job output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            name,
            log_dir,
            time,
            gpus,
            quiet,
            command,
        } => {
            cli::handle_run(name, log_dir, time, gpus, quiet, command)?;
        }
    }

    Ok(())
}
