//! External process execution.
//!
//! Runs a single program with an explicit argument vector (no shell), draining
//! stdout and stderr concurrently while the process runs so neither pipe can
//! fill up and stall the child.
//!
//! On unix every process leads its own process group, so a timeout takes down
//! whatever it spawned as well.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Errors that can occur while running an external process.
#[derive(Debug, Error)]
pub enum ProcessError {
  /// The program could not be launched (missing binary, permission denied).
  #[error("failed to launch {program}: {source}")]
  Spawn { program: String, source: std::io::Error },

  /// The program ran and exited unsuccessfully.
  #[error("{program} {}", describe_exit(*code))]
  Failed {
    program: String,
    code: Option<i32>,
    stdout: String,
    stderr: String,
  },

  /// The program ran past its deadline and was killed.
  #[error("{program} did not finish within {timeout:?}")]
  TimedOut { program: String, timeout: Duration },

  /// Reading the program's output or waiting on it failed.
  #[error("failed to collect output of {program}: {source}")]
  Io { program: String, source: std::io::Error },
}

fn describe_exit(code: Option<i32>) -> String {
  match code {
    Some(code) => format!("exited with code {code}"),
    None => "was terminated by a signal".to_string(),
  }
}

/// Output of a process that exited successfully.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
  pub stdout: String,
  pub stderr: String,
  pub code: Option<i32>,
}

/// Run `program` with `args` in `cwd`.
///
/// # Arguments
///
/// * `program` - Program name (resolved through `PATH`) or path
/// * `args` - Arguments, passed through verbatim
/// * `cwd` - Working directory for the process
/// * `timeout` - Optional deadline; the process is killed when it passes
///
/// # Returns
///
/// The captured output when the process exits with status 0.
pub async fn run(
  program: &str,
  args: &[String],
  cwd: &Path,
  timeout: Option<Duration>,
) -> Result<ProcessOutput, ProcessError> {
  info!(program = %program, args = ?args, "running process");
  debug!(working_dir = ?cwd, "spawning process");

  let mut command = Command::new(program);
  command
    .args(args)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);
  #[cfg(unix)]
  command.process_group(0);

  let mut child = command
    .spawn()
    .map_err(|source| ProcessError::Spawn {
      program: program.to_string(),
      source,
    })?;

  let stdout = child.stdout.take();
  let stderr = child.stderr.take();

  let collect = async {
    tokio::try_join!(
      drain(stdout, "stdout", program),
      drain(stderr, "stderr", program),
      child.wait()
    )
  };

  let finished = match timeout {
    Some(limit) => tokio::time::timeout(limit, collect).await.ok(),
    None => Some(collect.await),
  };

  let Some(finished) = finished else {
    warn!(program = %program, timeout = ?timeout, "process timed out, killing it");
    #[cfg(unix)]
    if let Some(pid) = child.id() {
      kill_group(program, pid);
    }
    if let Err(e) = child.kill().await {
      warn!(program = %program, error = %e, "failed to kill timed out process");
    }
    return Err(ProcessError::TimedOut {
      program: program.to_string(),
      timeout: timeout.unwrap_or_default(),
    });
  };

  let (stdout, stderr, status) = finished.map_err(|source| ProcessError::Io {
    program: program.to_string(),
    source,
  })?;

  let stdout = String::from_utf8_lossy(&stdout).into_owned();
  let stderr = String::from_utf8_lossy(&stderr).into_owned();

  if !status.success() {
    return Err(ProcessError::Failed {
      program: program.to_string(),
      code: status.code(),
      stdout,
      stderr,
    });
  }

  debug!(program = %program, stdout_bytes = stdout.len(), stderr_bytes = stderr.len(), "process finished");

  Ok(ProcessOutput {
    stdout,
    stderr,
    code: status.code(),
  })
}

/// Send SIGKILL to the process group led by `pid`.
#[cfg(unix)]
fn kill_group(program: &str, pid: u32) {
  use rustix::process::{Pid, Signal, kill_process_group};

  let Some(pgid) = i32::try_from(pid).ok().and_then(Pid::from_raw) else {
    return;
  };
  if let Err(e) = kill_process_group(pgid, Signal::KILL) {
    warn!(program = %program, pgid = pid, error = %e, "failed to kill process group");
  }
}

/// Read a pipe to the end, logging each line as it arrives.
async fn drain<R>(pipe: Option<R>, stream: &'static str, program: &str) -> std::io::Result<Vec<u8>>
where
  R: AsyncRead + Unpin,
{
  let mut buffer = Vec::new();
  let Some(pipe) = pipe else {
    return Ok(buffer);
  };

  let mut reader = BufReader::new(pipe);
  loop {
    let start = buffer.len();
    if reader.read_until(b'\n', &mut buffer).await? == 0 {
      break;
    }
    let line = String::from_utf8_lossy(&buffer[start..]);
    debug!(program = %program, stream, line = %line.trim_end(), "process output");
  }

  Ok(buffer)
}
