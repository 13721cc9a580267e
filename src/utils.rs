//! Utility functions for external command execution and wall-time formatting.

use anyhow::{Context, Result};
use std::process::Command;
use std::time::Duration;

/// Result of running an external scheduler command
#[derive(Debug)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
}

/// Execute an external command and return stdout, stderr, and return code.
///
/// # Arguments
/// * `cmd` - Command and arguments as a slice
pub fn run_command(cmd: &[&str]) -> Result<CommandResult> {
    if cmd.is_empty() {
        anyhow::bail!("Empty command");
    }

    let output = Command::new(cmd[0])
        .args(&cmd[1..])
        .output()
        .with_context(|| format!("Failed to execute command: {}", cmd[0]))?;

    Ok(CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        return_code: output.status.code().unwrap_or(-1),
    })
}

/// Format a duration as a SLURM wall-time string.
///
/// Hours are not capped at 24; `48:00:00` is a valid SLURM time limit.
pub fn format_wall_time(limit: Duration) -> String {
    let total = limit.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Parse a SLURM wall-time string (`DD-HH:MM:SS`, `HH:MM:SS`, or `MM:SS`).
pub fn parse_wall_time(s: &str) -> Result<Duration> {
    let (days, clock) = match s.split_once('-') {
        Some((d, rest)) => (
            d.parse::<u64>()
                .with_context(|| format!("Invalid day count in wall time: {}", s))?,
            rest,
        ),
        None => (0, s),
    };

    let fields: Vec<u64> = clock
        .split(':')
        .map(|p| {
            p.parse::<u64>()
                .with_context(|| format!("Invalid wall time: {}", s))
        })
        .collect::<Result<_>>()?;

    let secs = match fields.as_slice() {
        [h, m, sec] => h * 3600 + m * 60 + sec,
        [m, sec] => m * 60 + sec,
        _ => anyhow::bail!("Invalid wall time: {} (expected [DD-]HH:MM:SS or MM:SS)", s),
    };

    Ok(Duration::from_secs(days * 86400 + secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_captures_output() {
        let result = run_command(&["echo", "hello"]).unwrap();
        assert_eq!(result.return_code, 0);
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.stderr.is_empty());
    }

    #[test]
    fn test_run_command_empty() {
        assert!(run_command(&[]).is_err());
    }

    #[test]
    fn test_format_wall_time() {
        assert_eq!(format_wall_time(Duration::from_secs(48 * 3600)), "48:00:00");
        assert_eq!(format_wall_time(Duration::from_secs(90)), "00:01:30");
        assert_eq!(
            format_wall_time(Duration::from_secs(2 * 3600 + 5 * 60 + 7)),
            "02:05:07"
        );
    }

    #[test]
    fn test_parse_wall_time() {
        assert_eq!(
            parse_wall_time("48:00:00").unwrap(),
            Duration::from_secs(48 * 3600)
        );
        assert_eq!(parse_wall_time("01:30").unwrap(), Duration::from_secs(90));
        assert_eq!(
            parse_wall_time("2-00:00:00").unwrap(),
            Duration::from_secs(48 * 3600)
        );
        assert!(parse_wall_time("banana").is_err());
        assert!(parse_wall_time("1:2:3:4").is_err());
    }

    #[test]
    fn test_wall_time_round_trip() {
        for s in ["00:00:00", "48:00:00", "02:05:07"] {
            assert_eq!(format_wall_time(parse_wall_time(s).unwrap()), s);
        }
    }
}
