//! Scheduler client wrapping sbatch submission and sacct status queries.

use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::utils::run_command;

/// Opaque identifier assigned by the scheduler at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
}

/// Job state as reported by the scheduler's accounting system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Not yet terminal: pending, running, or not visible in accounting
    InQueue,
    Completed,
    /// Carries the raw status blob for the caller
    Failed(String),
    /// Carries the raw status blob for the caller
    Cancelled(String),
}

/// The scheduler rejected the submission. Non-retryable.
#[derive(Debug, Error)]
#[error("job submission failed: {stderr}")]
pub struct SubmitError {
    /// Captured stderr of the submission command, verbatim
    pub stderr: String,
}

/// The two external scheduler operations the driver needs.
pub trait Scheduler {
    /// Submit a batch script and return the assigned job handle.
    fn submit(&mut self, script: &Path) -> Result<JobHandle, SubmitError>;

    /// Query the current state of a submitted job.
    ///
    /// Never fails: a query command that cannot run or exits non-zero
    /// is reported as [`JobState::InQueue`] so the caller retries on
    /// its next poll.
    fn query_state(&mut self, handle: &JobHandle) -> JobState;
}

/// Extract the job id from sbatch output.
///
/// sbatch prints "Submitted batch job 12345" (or just "12345" with
/// `--parsable`); either way the id is the last whitespace-separated
/// token.
pub fn parse_job_id(sbatch_output: &str) -> Option<String> {
    sbatch_output
        .split_whitespace()
        .last()
        .map(|id| id.to_string())
}

/// Classify a raw sacct status blob by substring match.
///
/// sacct emits one state token per job step, so a single blob can mix
/// tokens. Negative states win: a job array with one FAILED step
/// reports failure even when other steps read COMPLETED.
pub fn classify_state(raw: &str) -> JobState {
    if raw.contains("FAILED") {
        JobState::Failed(raw.to_string())
    } else if raw.contains("CANCELLED") {
        JobState::Cancelled(raw.to_string())
    } else if raw.contains("COMPLETED") {
        JobState::Completed
    } else {
        JobState::InQueue
    }
}

/// Scheduler client talking to a real SLURM installation.
#[derive(Debug, Default)]
pub struct SlurmScheduler;

impl SlurmScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for SlurmScheduler {
    fn submit(&mut self, script: &Path) -> Result<JobHandle, SubmitError> {
        let script_arg = script.to_string_lossy();
        let result = run_command(&["sbatch", script_arg.as_ref()]).map_err(|e| SubmitError {
            stderr: format!("{:#}", e),
        })?;

        if result.return_code != 0 {
            return Err(SubmitError {
                stderr: result.stderr,
            });
        }

        match parse_job_id(&result.stdout) {
            Some(id) => Ok(JobHandle { id }),
            None => Err(SubmitError {
                stderr: result.stderr,
            }),
        }
    }

    fn query_state(&mut self, handle: &JobHandle) -> JobState {
        let result = run_command(&["sacct", "-j", &handle.id, "--format=State", "--noheader"]);

        match result {
            Ok(r) if r.return_code == 0 => classify_state(&r.stdout),
            Ok(r) => {
                warn!(
                    "Status query for job {} exited with code {}: {}",
                    handle.id,
                    r.return_code,
                    r.stderr.trim()
                );
                JobState::InQueue
            }
            Err(e) => {
                warn!("Status query for job {} could not run: {:#}", handle.id, e);
                JobState::InQueue
            }
        }
    }
}
