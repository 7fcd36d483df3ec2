//! Declarative description of multi-stage process pipelines.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s whose stdout feeds the
//! next stage's stdin. Execution lives behind the `PipelineRunner` port; this
//! module only describes the work and interprets the per-stage results.

use std::path::PathBuf;
use std::time::Duration;

/// One external process in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Short label used in errors and logs (e.g. `"archive"`, `"encrypt"`).
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl Stage {
    pub fn new<I, S>(name: &str, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `program arg…` for log lines.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Where the first stage reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineInput {
    Null,
    /// Written to the first stage's stdin, then closed.
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Where the last stage writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutput {
    Null,
    Capture,
    /// An existing file is truncated and keeps its permission bits.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    pub input: PipelineInput,
    pub output: PipelineOutput,
    pub timeout: Duration,
}

impl Pipeline {
    #[must_use]
    pub fn new(stages: Vec<Stage>, timeout: Duration) -> Self {
        Self {
            stages,
            input: PipelineInput::Null,
            output: PipelineOutput::Null,
            timeout,
        }
    }

    #[must_use]
    pub fn input(mut self, input: PipelineInput) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub fn output(mut self, output: PipelineOutput) -> Self {
        self.output = output;
        self
    }
}

/// Exit status of one stage. `code` is `None` when killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStatus {
    pub success: bool,
    pub code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub name: String,
    pub status: StageStatus,
    pub stderr: String,
}

impl StageReport {
    /// Human summary of a failed stage, e.g. `"decrypt exited with status 1: no identity matched"`.
    #[must_use]
    pub fn describe_failure(&self) -> String {
        let how = match self.status.code {
            Some(code) => format!("exited with status {code}"),
            None => "was terminated by a signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("{} {how}", self.name)
        } else {
            format!("{} {how}: {stderr}", self.name)
        }
    }
}

/// Outcome of a pipeline that ran to completion (each stage exited).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    /// Last stage's stdout when the output was [`PipelineOutput::Capture`].
    pub stdout: Vec<u8>,
}

impl PipelineReport {
    /// First stage in pipeline order that did not exit successfully.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&StageReport> {
        self.stages.iter().find(|s| !s.status.success)
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.failed_stage().is_none()
    }
}
