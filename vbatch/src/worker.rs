//! Per-task pipeline executor.
//!
//! A worker drives one task through probe → optional stabilization analysis
//! → encode, forwarding raw output lines and rising progress percentages as
//! events. Whatever the outcome, the stabilization transform file is removed
//! before the terminal event goes out.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::command::{CommandBuilder, CommandSpec};
use crate::error::Error;
use crate::events::EventSender;
use crate::process::{ProcessControl, ProcessController};
use crate::progress;
use crate::task::{Task, TaskStatus};

/// How one run of the stage pipeline ended.
enum PipelineEnd {
    Completed,
    Cancelled,
    Failed(String),
}

/// Executes the stage pipeline for exactly one task.
pub struct Worker {
    task: Task,
    binary: PathBuf,
    events: EventSender,
    cancel: CancellationToken,
    control: Arc<ProcessControl>,
}

impl Worker {
    pub fn new(
        task: Task,
        binary: PathBuf,
        events: EventSender,
        cancel: CancellationToken,
        control: Arc<ProcessControl>,
    ) -> Self {
        Self {
            task,
            binary,
            events,
            cancel,
            control,
        }
    }

    /// Drive the task to a terminal state, consuming the worker.
    pub async fn run(mut self) -> TaskStatus {
        if self.cancel.is_cancelled() {
            self.set_status(TaskStatus::Cancelled).await;
            return TaskStatus::Cancelled;
        }

        self.set_status(TaskStatus::Running).await;

        let end = self.run_stages().await;
        self.cleanup().await;

        match end {
            PipelineEnd::Completed => {
                self.task.progress = 100;
                self.events.progress(self.task.id, 100).await;
                self.set_status(TaskStatus::Completed).await;
                self.events.finished(self.task.id).await;
                TaskStatus::Completed
            }
            PipelineEnd::Failed(message) => {
                self.task.error = Some(message.clone());
                self.events.error(self.task.id, message).await;
                self.set_status(TaskStatus::Failed).await;
                TaskStatus::Failed
            }
            PipelineEnd::Cancelled => {
                self.set_status(TaskStatus::Cancelled).await;
                TaskStatus::Cancelled
            }
        }
    }

    async fn run_stages(&mut self) -> PipelineEnd {
        // Stage 1: duration probe. No progress, no log events; the exit
        // code is ignored because the encoder exits non-zero when invoked
        // without an output file.
        let total = match self.probe_duration().await {
            Ok(Some(total)) => total,
            Ok(None) => return PipelineEnd::Cancelled,
            Err(e) => return PipelineEnd::Failed(e.to_string()),
        };
        if total <= 0.0 {
            debug!(
                task = %self.task.id,
                "source duration unknown; progress reporting disabled"
            );
        }

        // Stage 2 (optional): stabilization analysis.
        let builder = CommandBuilder::new(&self.binary, &self.task);
        if let Some(spec) = builder.analysis_spec() {
            match self.run_stage(&spec, total).await {
                Ok(Some(0)) => {}
                Ok(Some(code)) => {
                    return PipelineEnd::Failed(Error::ProcessExit { code }.to_string());
                }
                Ok(None) => return PipelineEnd::Cancelled,
                Err(e) => return PipelineEnd::Failed(e.to_string()),
            }
        }

        // The caller may have pointed the output at a directory that does
        // not exist yet.
        if let Some(parent) = self.task.output.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return PipelineEnd::Failed(format!("cannot create output directory: {e}"));
            }
        }

        // Stage 3: the encode itself.
        let spec = CommandBuilder::new(&self.binary, &self.task).encode_spec(total);
        match self.run_stage(&spec, total).await {
            Ok(Some(0)) => PipelineEnd::Completed,
            Ok(Some(code)) => PipelineEnd::Failed(Error::ProcessExit { code }.to_string()),
            Ok(None) => PipelineEnd::Cancelled,
            Err(e) => PipelineEnd::Failed(e.to_string()),
        }
    }

    /// Probe the source for its total duration in seconds. `Ok(None)` means
    /// the worker was cancelled mid-probe; `Ok(Some(0.0))` means the source
    /// did not report a duration.
    async fn probe_duration(&mut self) -> crate::Result<Option<f64>> {
        let spec = CommandBuilder::new(&self.binary, &self.task).probe_spec();
        let mut proc = ProcessController::new(self.control.clone());
        proc.spawn(&spec)?;

        let mut output = String::new();
        let cancelled = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    proc.kill().await;
                    break true;
                }
                line = proc.next_line() => match line {
                    Some(line) => {
                        output.push_str(&line);
                        output.push('\n');
                    }
                    None => break false,
                }
            }
        };
        let _ = proc.wait().await;

        if cancelled {
            return Ok(None);
        }
        Ok(Some(progress::parse_duration(&output)))
    }

    /// Run one stage to completion, streaming log lines and progress.
    /// `Ok(None)` means the stage observed cancellation and the process was
    /// killed.
    async fn run_stage(&mut self, spec: &CommandSpec, total: f64) -> crate::Result<Option<i32>> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let mut proc = ProcessController::new(self.control.clone());
        proc.spawn(spec)?;

        let cancelled = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    proc.kill().await;
                    break true;
                }
                line = proc.next_line() => match line {
                    Some(line) => {
                        self.handle_output_line(&line, total).await;
                    }
                    None => break false,
                }
            }
        };

        if cancelled {
            let _ = proc.wait().await;
            return Ok(None);
        }
        let code = proc.wait().await?;
        Ok(Some(code))
    }

    async fn handle_output_line(&mut self, line: &str, total: f64) {
        self.events.log(self.task.id, line.trim_end()).await;

        // One rising series of percentages per task: a later stage only
        // surfaces values above the previous stage's high-water mark.
        if let Some(current) = progress::parse_time_field(line) {
            if let Some(percent) = progress::to_percent(current, total) {
                if percent > self.task.progress {
                    self.task.progress = percent;
                    self.events.progress(self.task.id, percent).await;
                }
            }
        }
    }

    async fn set_status(&mut self, status: TaskStatus) {
        self.task.status = status;
        self.events.status(self.task.id, status).await;
    }

    /// Remove the stabilization transform file, whatever happened. Deletion
    /// failures are logged and swallowed; they never fail the task.
    async fn cleanup(&self) {
        if self.task.stabilization == 0 {
            return;
        }
        let trf = CommandBuilder::new(&self.binary, &self.task).transform_file();
        match tokio::fs::remove_file(&trf).await {
            Ok(()) => debug!(task = %self.task.id, "removed transform file {}", trf.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                task = %self.task.id,
                "failed to remove transform file {}: {e}",
                trf.display()
            ),
        }
    }
}
