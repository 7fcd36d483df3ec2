//! Infrastructure implementation of the `PipelineRunner` port.
//!
//! Every stage is a tokio child with piped stdio. The runner pumps each
//! stage's stdout into the next stage's stdin and drops both ends as soon as
//! a pump finishes, so a stage that exits early closes the pipe upstream
//! instead of leaving the writer blocked. All children are created with
//! `kill_on_drop`, which is how the timeout and early-return paths stop them.

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt as _;
use std::process::Stdio;

use anyhow::Result;
use futures_util::future::join_all;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

use super::command_runner::drain;
use crate::application::ports::PipelineRunner;
use crate::domain::error::PipelineError;
use crate::domain::pipeline::{
    Pipeline, PipelineInput, PipelineOutput, PipelineReport, Stage, StageReport, StageStatus,
};

/// Production `PipelineRunner`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPipelineRunner;

impl TokioPipelineRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PipelineRunner for TokioPipelineRunner {
    async fn run_pipeline(&self, pipeline: &Pipeline) -> Result<PipelineReport> {
        if pipeline.stages.is_empty() {
            return Err(PipelineError::Empty.into());
        }
        let line = pipeline
            .stages
            .iter()
            .map(Stage::command_line)
            .collect::<Vec<_>>()
            .join(" | ");
        tracing::debug!(pipeline = %line, "running pipeline");

        tokio::select! {
            result = execute(pipeline) => result,
            () = tokio::time::sleep(pipeline.timeout) => {
                // Dropping `execute` drops every child, which kills it.
                tracing::warn!(pipeline = %line, secs = pipeline.timeout.as_secs(), "pipeline timed out");
                Err(PipelineError::TimedOut { secs: pipeline.timeout.as_secs() }.into())
            }
        }
    }
}

fn io_error(what: impl Into<String>, err: &std::io::Error) -> PipelineError {
    PipelineError::Io {
        what: what.into(),
        reason: err.to_string(),
    }
}

fn spawn_stage(stage: &Stage, stdin: Stdio, stdout: Stdio) -> Result<Child, PipelineError> {
    Command::new(&stage.program)
        .args(&stage.args)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::ProgramNotFound {
                    stage: stage.name.clone(),
                    program: stage.program.clone(),
                }
            } else {
                PipelineError::Spawn {
                    stage: stage.name.clone(),
                    reason: e.to_string(),
                }
            }
        })
}

fn first_stdin(input: &PipelineInput) -> Result<Stdio, PipelineError> {
    Ok(match input {
        PipelineInput::Null => Stdio::null(),
        PipelineInput::Bytes(_) => Stdio::piped(),
        PipelineInput::File(path) => {
            let file = std::fs::File::open(path)
                .map_err(|e| io_error(format!("opening input {}", path.display()), &e))?;
            Stdio::from(file)
        }
    })
}

fn last_stdout(output: &PipelineOutput) -> Result<Stdio, PipelineError> {
    Ok(match output {
        PipelineOutput::Null => Stdio::null(),
        PipelineOutput::Capture => Stdio::piped(),
        PipelineOutput::File(path) => {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .map_err(|e| io_error(format!("opening output {}", path.display()), &e))?;
            Stdio::from(file)
        }
    })
}

async fn execute(pipeline: &Pipeline) -> Result<PipelineReport> {
    let last = pipeline.stages.len() - 1;
    let mut children = Vec::with_capacity(pipeline.stages.len());
    for (i, stage) in pipeline.stages.iter().enumerate() {
        let stdin = if i == 0 {
            first_stdin(&pipeline.input)?
        } else {
            Stdio::piped()
        };
        let stdout = if i == last {
            last_stdout(&pipeline.output)?
        } else {
            Stdio::piped()
        };
        children.push(spawn_stage(stage, stdin, stdout)?);
    }

    let mut stdins: Vec<_> = children.iter_mut().map(|c| c.stdin.take()).collect();
    let mut stdouts: Vec<_> = children.iter_mut().map(|c| c.stdout.take()).collect();
    let stderrs: Vec<_> = children.iter_mut().map(|c| c.stderr.take()).collect();

    let feed = {
        let writer = stdins[0].take();
        let bytes = match &pipeline.input {
            PipelineInput::Bytes(b) => Some(b.as_slice()),
            _ => None,
        };
        async move {
            if let (Some(mut w), Some(bytes)) = (writer, bytes) {
                // A stage that stops reading early is judged by its own status.
                let _ = w.write_all(bytes).await;
                let _ = w.shutdown().await;
            }
        }
    };

    let capture = {
        let reader = if matches!(pipeline.output, PipelineOutput::Capture) {
            stdouts[last].take()
        } else {
            None
        };
        drain(reader)
    };

    let pumps = join_all((0..last).map(|i| {
        let reader = stdouts[i].take();
        let writer = stdins[i + 1].take();
        async move {
            if let (Some(mut r), Some(mut w)) = (reader, writer) {
                if let Err(e) = tokio::io::copy(&mut r, &mut w).await {
                    tracing::debug!(stage = i, error = %e, "pipe closed early");
                }
                let _ = w.shutdown().await;
            }
        }
    }));

    let stderr_reads = join_all(stderrs.into_iter().map(|handle| async move {
        String::from_utf8_lossy(&drain(handle).await).into_owned()
    }));

    let waits = join_all(children.iter_mut().map(|c| c.wait()));

    let ((), stdout, _, stderr, statuses) =
        tokio::join!(feed, capture, pumps, stderr_reads, waits);

    let mut stages = Vec::with_capacity(pipeline.stages.len());
    for ((stage, status), stderr) in pipeline.stages.iter().zip(statuses).zip(stderr) {
        let status = status.map_err(|e| io_error(format!("waiting for stage '{}'", stage.name), &e))?;
        stages.push(StageReport {
            name: stage.name.clone(),
            status: StageStatus {
                success: status.success(),
                code: status.code(),
            },
            stderr,
        });
    }
    Ok(PipelineReport { stages, stdout })
}
