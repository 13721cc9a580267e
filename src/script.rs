//! Batch-script rendering for SLURM job submission.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::utils::format_wall_time;

/// Resource request for a single batch job.
///
/// Immutable once constructed; consumed by [`build`] to render the
/// submission script.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Job name shown by the scheduler
    pub name: String,
    /// Command line to run, copied into the script verbatim
    pub command: String,
    /// Directory holding the `run/` log subdirectory
    pub log_dir: PathBuf,
    /// Wall-clock limit requested from the scheduler
    pub wall_time: Duration,
    /// Number of GPUs to request
    pub gpus: u32,
}

/// A rendered submission script on disk.
///
/// The file is written once and intentionally kept after the run so a
/// failed submission can be inspected post-mortem.
#[derive(Debug)]
pub struct SubmissionScript {
    pub path: PathBuf,
    #[allow(dead_code)]
    pub contents: String,
}

/// Derived stdout log path for a submitted job.
pub fn stdout_log_path(log_dir: &Path, job_id: &str) -> PathBuf {
    log_dir.join("run").join(format!("stdout-{}.log", job_id))
}

/// Derived stderr log path for a submitted job.
///
/// Progress output is expected on stderr, so this is the file the
/// driver tails.
pub fn stderr_log_path(log_dir: &Path, job_id: &str) -> PathBuf {
    log_dir.join("run").join(format!("stderr-{}.log", job_id))
}

/// Render the submission script for `spec`.
///
/// The `%j` tokens in the log paths are SLURM placeholders, substituted
/// with the job id by the scheduler when the log files are created. The
/// user command is the final statement, copied byte-for-byte.
fn render(spec: &JobSpec) -> String {
    format!(
        "#!/bin/bash\n\
         #SBATCH --job-name={name}\n\
         #SBATCH --output={log_dir}/run/stdout-%j.log\n\
         #SBATCH --error={log_dir}/run/stderr-%j.log\n\
         #SBATCH --time={time}\n\
         #SBATCH --gpus={gpus}\n\
         \n\
         {command}\n",
        name = spec.name,
        log_dir = spec.log_dir.display(),
        time = format_wall_time(spec.wall_time),
        gpus = spec.gpus,
        command = spec.command,
    )
}

/// Render `spec` and write it to a fresh, uniquely-named script file.
///
/// The file persists after this process exits.
pub fn build(spec: &JobSpec) -> Result<SubmissionScript> {
    let contents = render(spec);

    let mut file = tempfile::Builder::new()
        .prefix("slurm_job_")
        .suffix(".sh")
        .tempfile()
        .context("Failed to create submission script file")?;
    file.write_all(contents.as_bytes())
        .context("Failed to write submission script")?;

    let (_, path) = file
        .keep()
        .map_err(|e| anyhow::anyhow!("Failed to persist submission script: {}", e))?;

    info!("Submission script created at {}", path.display());

    Ok(SubmissionScript { path, contents })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(command: &str) -> JobSpec {
        JobSpec {
            name: "test_job".to_string(),
            command: command.to_string(),
            log_dir: PathBuf::from("/scratch/logs"),
            wall_time: Duration::from_secs(48 * 3600),
            gpus: 1,
        }
    }

    #[test]
    fn test_render_command_verbatim() {
        let command = "singularity exec img.sif alphafold --fasta=a.fa  --flag='x y'";
        let contents = render(&spec(command));

        // The command is the final statement, byte-for-byte.
        let last = contents.trim_end().lines().last().unwrap();
        assert_eq!(last, command);
    }

    #[test]
    fn test_render_directives() {
        let contents = render(&spec("echo hi"));

        assert!(contents.starts_with("#!/bin/bash\n"));
        assert!(contents.contains("#SBATCH --job-name=test_job\n"));
        assert!(contents.contains("#SBATCH --output=/scratch/logs/run/stdout-%j.log\n"));
        assert!(contents.contains("#SBATCH --error=/scratch/logs/run/stderr-%j.log\n"));
        assert!(contents.contains("#SBATCH --time=48:00:00\n"));
        assert!(contents.contains("#SBATCH --gpus=1\n"));
    }

    #[test]
    fn test_build_writes_script() {
        let script = build(&spec("echo hi")).unwrap();

        let on_disk = std::fs::read_to_string(&script.path).unwrap();
        assert_eq!(on_disk, script.contents);
        assert!(script.path.to_string_lossy().ends_with(".sh"));

        std::fs::remove_file(&script.path).unwrap();
    }

    #[test]
    fn test_build_unique_paths() {
        let a = build(&spec("echo a")).unwrap();
        let b = build(&spec("echo b")).unwrap();
        assert_ne!(a.path, b.path);

        std::fs::remove_file(&a.path).unwrap();
        std::fs::remove_file(&b.path).unwrap();
    }

    #[test]
    fn test_log_path_derivation() {
        let dir = Path::new("/scratch/logs");
        assert_eq!(
            stderr_log_path(dir, "12345"),
            PathBuf::from("/scratch/logs/run/stderr-12345.log")
        );
        assert_eq!(
            stdout_log_path(dir, "12345"),
            PathBuf::from("/scratch/logs/run/stdout-12345.log")
        );
    }
}
