//! Job lifecycle driver: build a script, submit it once, poll to a
//! terminal state while tailing the job's stderr log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::log_tailer::LogTail;
use crate::scheduler::{JobState, Scheduler};
use crate::script::{self, JobSpec};

/// Default interval between scheduler polls. Bounds polling load and
/// live-update latency; not a correctness requirement.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Granularity at which the inter-poll sleep observes the cancel flag.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Receives the full accumulated job output so far.
///
/// Called at most once per poll iteration, and only when that
/// iteration produced new lines.
pub trait Observer {
    fn update(&mut self, output: &str);
}

/// Terminal result of one driver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Job completed; carries the accumulated log output
    Succeeded(String),
    /// Scheduler rejected the submission; carries its stderr verbatim
    Rejected(String),
    /// Job reached FAILED or CANCELLED; carries the raw status blob
    Failed(String),
    /// Unexpected local error; carries its description
    Error(String),
    /// The cancel flag was raised; the external job keeps running
    Aborted,
}

/// Drives a single job from submission to a terminal state.
///
/// One runner owns one job handle and one tail cursor per run; running
/// twice performs two independent submissions. Separate runner
/// instances share no state and may run concurrently.
pub struct JobRunner<S> {
    scheduler: S,
    poll_interval: Duration,
    cancel: Arc<AtomicBool>,
}

impl<S: Scheduler> JobRunner<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Flag a host thread can raise to abort the poll loop between
    /// iterations. The external job is left running on the scheduler.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Drive one job to completion.
    ///
    /// Never panics the host and never propagates: every failure path
    /// is folded into a [`RunOutcome`] carrying a diagnostic string.
    pub fn run(&mut self, spec: &JobSpec, observer: Option<&mut dyn Observer>) -> RunOutcome {
        match self.run_inner(spec, observer) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Job run aborted by unexpected error: {:#}", e);
                RunOutcome::Error(format!("{:#}", e))
            }
        }
    }

    fn run_inner(
        &mut self,
        spec: &JobSpec,
        mut observer: Option<&mut dyn Observer>,
    ) -> anyhow::Result<RunOutcome> {
        let submission = script::build(spec)?;

        let handle = match self.scheduler.submit(&submission.path) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to submit job: {}", e.stderr.trim());
                return Ok(RunOutcome::Rejected(e.stderr));
            }
        };
        info!("Job submitted with id {}", handle.id);
        info!(
            "Job stdout log: {}",
            script::stdout_log_path(&spec.log_dir, &handle.id).display()
        );

        let mut tail = LogTail::new(script::stderr_log_path(&spec.log_dir, &handle.id));
        debug!("Tailing {}", tail.path().display());
        let mut output: Vec<String> = Vec::new();

        loop {
            match self.scheduler.query_state(&handle) {
                JobState::Completed => {
                    // Flush lines written after the previous poll.
                    output.extend(tail.read_new()?);
                    info!("Job {} completed", handle.id);
                    return Ok(RunOutcome::Succeeded(output.join("\n")));
                }
                JobState::Failed(raw) | JobState::Cancelled(raw) => {
                    // No further output is expected; skip the log read.
                    error!("Job {} failed or was cancelled", handle.id);
                    return Ok(RunOutcome::Failed(raw));
                }
                JobState::InQueue => {}
            }

            let new_lines = tail.read_new()?;
            if !new_lines.is_empty() {
                for line in &new_lines {
                    debug!("{}", line);
                }
                output.extend(new_lines);
                if let Some(obs) = &mut observer {
                    obs.update(&output.join("\n"));
                }
            }

            if self.sleep_observing_cancel() {
                info!("Run for job {} aborted; the job stays on the scheduler", handle.id);
                return Ok(RunOutcome::Aborted);
            }
        }
    }

    /// Sleep one poll interval in slices. Returns true when cancelled.
    fn sleep_observing_cancel(&self) -> bool {
        let mut elapsed = Duration::ZERO;
        while elapsed < self.poll_interval {
            if self.cancel.load(Ordering::Relaxed) {
                return true;
            }
            let step = CANCEL_CHECK_INTERVAL.min(self.poll_interval - elapsed);
            thread::sleep(step);
            elapsed += step;
        }
        self.cancel.load(Ordering::Relaxed)
    }
}
