//! CLI entry point and command definitions.

use crate::driver::{JobRunner, Observer, RunOutcome};
use crate::scheduler::SlurmScheduler;
use crate::script::JobSpec;
use crate::utils::parse_wall_time;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

/// SLURM Runner - submit a command as a batch job and stream its output.
#[derive(Parser)]
#[command(name = "slurm-runner")]
#[command(version = "0.1.0")]
#[command(about = "Submit a command as a SLURM batch job and stream its log output")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a command and follow the job to a terminal state
    Run {
        /// Job name shown by the scheduler
        #[arg(long, default_value = "slurm_runner_job")]
        name: String,
        /// Directory holding the run/ log subdirectory
        #[arg(long, default_value = ".")]
        log_dir: PathBuf,
        /// Wall-clock limit ([DD-]HH:MM:SS or MM:SS)
        #[arg(long, default_value = "48:00:00")]
        time: String,
        /// Number of GPUs to request
        #[arg(long, default_value_t = 1)]
        gpus: u32,
        /// Do not stream job output while polling
        #[arg(long)]
        quiet: bool,
        /// Command to run, copied into the job script verbatim
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
}

/// Streams accumulated job output to a writer, printing only the
/// suffix not yet shown.
struct StreamObserver<W: Write> {
    out: W,
    printed: usize,
}

impl<W: Write> StreamObserver<W> {
    fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }
}

impl<W: Write> Observer for StreamObserver<W> {
    fn update(&mut self, output: &str) {
        if output.len() > self.printed {
            // The accumulated text only ever grows, so this offset is
            // always a valid boundary into the new text.
            let _ = self.out.write_all(output[self.printed..].as_bytes());
            let _ = self.out.flush();
            self.printed = output.len();
        }
    }
}

/// Handle the run command.
pub fn handle_run(
    name: String,
    log_dir: PathBuf,
    time: String,
    gpus: u32,
    quiet: bool,
    command: Vec<String>,
) -> Result<()> {
    let wall_time = parse_wall_time(&time).context("Invalid --time value")?;
    let spec = JobSpec {
        name,
        command: command.join(" "),
        log_dir,
        wall_time,
        gpus,
    };

    let mut runner = JobRunner::new(SlurmScheduler::new());
    let mut stream = StreamObserver::new(io::stdout());
    let observer: Option<&mut dyn Observer> = if quiet { None } else { Some(&mut stream) };

    match runner.run(&spec, observer) {
        RunOutcome::Succeeded(output) => {
            if !quiet && !output.is_empty() {
                println!();
            }
            println!("Job completed.");
            Ok(())
        }
        RunOutcome::Rejected(stderr) => {
            anyhow::bail!("Submission rejected by the scheduler: {}", stderr.trim())
        }
        RunOutcome::Failed(raw) => {
            anyhow::bail!("Job did not complete: {}", raw.trim())
        }
        RunOutcome::Error(message) => anyhow::bail!("{}", message),
        RunOutcome::Aborted => anyhow::bail!("Run aborted before the job finished"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_parses_trailing_command() {
        let cli = Cli::parse_from([
            "slurm-runner",
            "run",
            "--log-dir",
            "/scratch/logs",
            "--time",
            "01:00:00",
            "--",
            "echo",
            "hello world",
        ]);
        let Commands::Run {
            log_dir, command, ..
        } = cli.command;
        assert_eq!(log_dir, PathBuf::from("/scratch/logs"));
        assert_eq!(command, vec!["echo", "hello world"]);
    }

    #[test]
    fn test_stream_observer_prints_only_new_suffix() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut obs = StreamObserver::new(&mut buf);
            obs.update("line1");
            obs.update("line1\nline2");
            // Duplicate update with no growth prints nothing.
            obs.update("line1\nline2");
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "line1\nline2");
    }
}
