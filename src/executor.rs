// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Runs one rendered command as a supervised child process.
use crate::error::ExecError;
use chrono::DateTime;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::process::Command;

/// How long to keep reading pipes after the process group was killed.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Everything needed to run one variant.
#[derive(Debug, Clone)]
pub struct ExecRequest<'a> {
  pub command: &'a str,
  /// Overlaid on the ambient environment; these keys win.
  pub env: &'a BTreeMap<String, String>,
  pub cwd: Option<&'a Path>,
  pub timeout: Option<Duration>,
  /// Time between SIGTERM and SIGKILL when a timeout fires.
  pub kill_grace: Duration,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
  /// `None` when the process was ended by a signal.
  pub exit_code: Option<i32>,
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
  pub duration: Duration,
  pub timed_out: bool,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

fn shell_command(command: &str) -> Command {
  if cfg!(target_os = "windows") {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
  } else {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
  }
}

/// Executes the request, enforcing its timeout.
///
/// A non-zero exit or a timeout is reported in the result. Only failing to
/// start, read or reap the process is an error. When the timeout fires the
/// whole process group is terminated and the child reaped before returning.
pub async fn execute(request: &ExecRequest<'_>) -> Result<ExecutionResult, ExecError> {
  let mut cmd = shell_command(request.command);
  cmd
    .envs(request.env)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);
  if let Some(cwd) = request.cwd {
    cmd.current_dir(cwd);
  }
  // Own process group, so the whole tree can be signalled at once.
  #[cfg(unix)]
  cmd.process_group(0);

  tracing::debug!(cmd = ?cmd, "Spawning variant");
  let started_at = Utc::now();
  let start = Instant::now();
  let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
    command: request.command.to_string(),
    source,
  })?;

  let mut stdout = child
    .stdout
    .take()
    .ok_or(ExecError::Pipe { stream: "stdout" })?;
  let mut stderr = child
    .stderr
    .take()
    .ok_or(ExecError::Pipe { stream: "stderr" })?;

  let mut out = Vec::new();
  let mut err = Vec::new();

  let finished = {
    let run = async {
      let (out_read, err_read, status) = tokio::join!(
        stdout.read_to_end(&mut out),
        stderr.read_to_end(&mut err),
        child.wait()
      );
      out_read.map_err(|source| ExecError::ReadStream {
        stream: "stdout",
        source,
      })?;
      err_read.map_err(|source| ExecError::ReadStream {
        stream: "stderr",
        source,
      })?;
      let status = status.map_err(ExecError::Wait)?;
      Ok::<ExitStatus, ExecError>(status)
    };

    match request.timeout {
      Some(limit) => tokio::time::timeout(limit, run).await.ok(),
      None => Some(run.await),
    }
  };

  let (status, timed_out) = match finished {
    Some(status) => (status?, false),
    None => {
      tracing::warn!(timeout = ?request.timeout, "Timed out, terminating process group");
      let status = terminate(&mut child, request.kill_grace).await?;
      let _ = tokio::time::timeout(DRAIN_GRACE, async {
        tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err))
      })
      .await;
      (status, true)
    }
  };

  let duration = start.elapsed();
  Ok(ExecutionResult {
    exit_code: status.code(),
    success: status.success() && !timed_out,
    stdout: String::from_utf8_lossy(&out).into_owned(),
    stderr: String::from_utf8_lossy(&err).into_owned(),
    duration,
    timed_out,
    started_at,
    finished_at: Utc::now(),
  })
}

/// SIGTERM to the group, SIGKILL after `grace`, then reap.
#[cfg(unix)]
async fn terminate(child: &mut Child, grace: Duration) -> Result<ExitStatus, ExecError> {
  use nix::sys::signal::Signal;
  use nix::sys::signal::killpg;
  use nix::unistd::Pid;

  let Some(pid) = child.id() else {
    // Already reaped.
    return child.wait().await.map_err(ExecError::Wait);
  };
  let group = Pid::from_raw(pid as i32);

  let _ = killpg(group, Signal::SIGTERM);
  let status = match tokio::time::timeout(grace, child.wait()).await {
    Ok(status) => status,
    Err(_) => {
      tracing::debug!(pid, "Process group ignored SIGTERM, sending SIGKILL");
      let _ = killpg(group, Signal::SIGKILL);
      child.wait().await
    }
  };
  // Descendants may outlive the group leader.
  let _ = killpg(group, Signal::SIGKILL);
  status.map_err(ExecError::Wait)
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child, _grace: Duration) -> Result<ExitStatus, ExecError> {
  let _ = child.start_kill();
  child.wait().await.map_err(ExecError::Wait)
}
