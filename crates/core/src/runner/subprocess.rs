//! Shared subprocess management.
//!
//! [`run_command`] holds the spawn, capture and timeout logic used by the
//! shell executor and the console host runner. Callers build a
//! [`tokio::process::Command`] with program and arguments and delegate here.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::error::RunnerError;

/// Maximum stdout or stderr size captured per stream (10 MiB).
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Appended to captured output when a stream went over [`MAX_OUTPUT_BYTES`].
pub const TRUNCATION_NOTICE: &str = "[output truncated]";

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    pub duration_ms: u64,
    /// Either stream produced more than [`MAX_OUTPUT_BYTES`]; the excess was
    /// read and discarded.
    pub truncated: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawn `cmd`, capture stdout/stderr, and enforce `timeout`.
///
/// Stdin is closed. The child is killed when the timeout fires.
pub async fn run_command(
    cmd: &mut Command,
    timeout: Duration,
    working_directory: Option<&Path>,
) -> Result<ProcessOutput, RunnerError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = working_directory {
        cmd.current_dir(dir);
    }

    let start = Instant::now();
    let mut child = cmd.spawn()?;

    // Read in spawned tasks so `child.wait()` can borrow `&mut child`.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let (stdout_bytes, stdout_cut) = stdout_task.await.unwrap_or_default();
            let (stderr_bytes, stderr_cut) = stderr_task.await.unwrap_or_default();

            Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms,
                truncated: stdout_cut || stderr_cut,
            })
        }
        Ok(Err(e)) => Err(RunnerError::Io(e)),
        // `child` is dropped here; kill_on_drop terminates the process.
        Err(_elapsed) => Err(RunnerError::timeout(start.elapsed())),
    }
}

/// Read an entire output stream, keeping the first [`MAX_OUTPUT_BYTES`].
///
/// The rest is drained into a sink so the child never sees a closed pipe.
/// Returns the kept bytes and whether anything was discarded.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> (Vec<u8>, bool) {
    let mut buf = Vec::new();
    let Some(mut h) = handle else {
        return (buf, false);
    };
    let _ = (&mut h)
        .take(MAX_OUTPUT_BYTES as u64)
        .read_to_end(&mut buf)
        .await;
    let discarded = tokio::io::copy(&mut h, &mut tokio::io::sink())
        .await
        .unwrap_or(0);
    (buf, discarded > 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
