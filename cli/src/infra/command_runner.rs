//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` runs one external program, captures both output
//! streams, and enforces a deadline.

use std::io::ErrorKind;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::application::ports::CommandRunner;
use crate::domain::error::CommandError;

/// Production `CommandRunner`. Each call gets a deadline; on expiry the
/// child is killed, not just abandoned.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn spawn_error(program: &str, err: &std::io::Error) -> CommandError {
    if err.kind() == ErrorKind::NotFound {
        CommandError::ProgramNotFound(program.to_string())
    } else {
        CommandError::Spawn {
            program: program.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Read a child pipe to EOF. Read errors end the capture early rather than
/// failing the command; the exit status is what callers judge.
pub(crate) async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "pipe read ended early");
        }
    }
    buf
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        tracing::debug!(program, ?args, "running command");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(program, &e))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        // Pipes drain alongside wait() so a chatty child cannot block on a full pipe.
        let finished = tokio::time::timeout(timeout, async {
            tokio::join!(child.wait(), stdout, stderr)
        })
        .await;

        let (status, stdout, stderr) = match finished {
            Ok(done) => done,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::debug!(program, error = %e, "kill after timeout failed");
                }
                tracing::warn!(program, secs = timeout.as_secs(), "command timed out");
                return Err(CommandError::TimedOut {
                    program: program.to_string(),
                    secs: timeout.as_secs(),
                }
                .into());
            }
        };

        Ok(Output {
            status: status.with_context(|| format!("waiting for {program}"))?,
            stdout,
            stderr,
        })
    }
}
