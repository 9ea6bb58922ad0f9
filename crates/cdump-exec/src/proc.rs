use std::process::{ExitStatus, Stdio};

use cdump_core::Sink;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{error::ExecError, util::kill_graceful};

/// Everything a finished process produced.
#[derive(Debug)]
pub struct Captured {
    pub command: String,
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Captured {
    /// `Ok(self)` on a zero exit status, [`ExecError::Failed`] otherwise.
    pub fn check(self) -> Result<Self, ExecError> {
        if self.status.success() {
            return Ok(self);
        }
        Err(ExecError::Failed {
            status: self.status.to_string(),
            stderr: String::from_utf8_lossy(&self.stderr).trim().to_string(),
            command: self.command,
        })
    }
}

/// Program and arguments joined by spaces.
pub fn describe(cmd: &Command) -> String {
    let std = cmd.as_std();
    std::iter::once(std.get_program())
        .chain(std.get_args())
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `cmd` to completion, buffering both output streams.
///
/// The child is terminated if `cancel` fires first.
pub async fn run_command(mut cmd: Command, cancel: &CancellationToken) -> Result<Captured, ExecError> {
    let command = describe(&cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    trace!(target: "cdump.exec.proc", %command, "spawn");
    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        command: command.clone(),
        source,
    })?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            let stdout = join(stdout).await?;
            let stderr = join(stderr).await?;
            debug!(target: "cdump.exec.proc", %command, %status, "exited");
            Ok(Captured { command, status, stdout, stderr })
        }
        _ = cancel.cancelled() => {
            debug!(target: "cdump.exec.proc", %command, "cancelled; killing child");
            let _ = kill_graceful(&mut child).await;
            stdout.abort();
            stderr.abort();
            Err(ExecError::Cancelled)
        }
    }
}

/// Runs `cmd`, committing stdout to `out` and a non-empty stderr to `err`.
///
/// Output is committed even when the command fails, so partial data stays
/// available; the failure is still returned.
pub async fn capture(
    cmd: Command,
    mut out: Box<dyn Sink>,
    mut err: Box<dyn Sink>,
    cancel: &CancellationToken,
) -> Result<(), ExecError> {
    let captured = run_command(cmd, cancel).await?;

    out.write(&captured.stdout);
    out.close().await?;
    if captured.stderr.is_empty() {
        drop(err);
    } else {
        err.write(&captured.stderr);
        err.close().await?;
    }
    captured.check().map(|_| ())
}

/// Splits command output on whitespace.
pub fn words(output: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(output)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn join(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, ExecError> {
    handle
        .await
        .map_err(|e| ExecError::Io(std::io::Error::other(e)))?
        .map_err(ExecError::from)
}
