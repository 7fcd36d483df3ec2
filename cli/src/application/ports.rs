//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces infrastructure must fulfill. This file imports
//! only from `crate::domain`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::pipeline::{Pipeline, PipelineReport};

// ── Process Ports ─────────────────────────────────────────────────────────────

/// Runs a single external command and collects its output.
///
/// Implementations surface a missing program as
/// [`CommandError::ProgramNotFound`](crate::domain::CommandError::ProgramNotFound)
/// and an expired deadline as
/// [`CommandError::TimedOut`](crate::domain::CommandError::TimedOut), inside
/// the returned `anyhow::Error`. A non-zero exit is not an error here.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run with the implementation's default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Run with an explicit timeout; the child is killed when it expires.
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

/// Runs a multi-stage pipeline to completion.
///
/// `Ok` means every stage was started and exited (possibly unsuccessfully);
/// per-stage outcomes are in the report. Spawn failures, I/O errors on the
/// endpoints, and timeouts are `Err` wrapping
/// [`PipelineError`](crate::domain::PipelineError).
#[allow(async_fn_in_trait)]
pub trait PipelineRunner {
    async fn run_pipeline(&self, pipeline: &Pipeline) -> Result<PipelineReport>;
}

// ── Progress Reporting ────────────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit step messages without
/// depending on the Presentation layer.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

/// Reporter that discards every message.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn step(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}
