//! Terminal progress rendering.
//!
//! One indicatif bar per task, driven by the scheduler's event stream.
//! Returns once every submitted task has reached a terminal state (or the
//! stream closes early).

use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use vbatch::{TaskEvent, TaskStatus};

/// Final tally of a batch run.
#[derive(Debug, Default)]
pub struct Summary {
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl Summary {
    fn terminal_count(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }
}

pub async fn render_events(
    mut events: mpsc::Receiver<TaskEvent>,
    labels: HashMap<Uuid, String>,
) -> Summary {
    let total = labels.len();
    let multi = MultiProgress::new();
    let style = ProgressStyle::with_template("{prefix:30!} [{bar:30}] {pos:>3}% {msg}")
        .expect("static template")
        .progress_chars("=> ");

    let mut bars: HashMap<Uuid, ProgressBar> = HashMap::new();
    let mut errors: HashMap<Uuid, String> = HashMap::new();
    let mut summary = Summary::default();

    while summary.terminal_count() < total {
        let Some(event) = events.recv().await else {
            break;
        };
        let task_id = event.task_id();
        let bar = bars.entry(task_id).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(style.clone());
            let label = labels
                .get(&task_id)
                .cloned()
                .unwrap_or_else(|| task_id.to_string());
            bar.set_prefix(label);
            bar
        });

        match event {
            TaskEvent::Progress { percent, .. } => bar.set_position(u64::from(percent)),
            TaskEvent::StatusChanged { status, .. } => match status {
                TaskStatus::Running => bar.set_message("running"),
                TaskStatus::Completed => {
                    summary.completed += 1;
                    bar.finish_with_message("done");
                }
                TaskStatus::Failed => {
                    summary.failed += 1;
                    let message = errors
                        .remove(&task_id)
                        .map(|m| format!("failed: {m}"))
                        .unwrap_or_else(|| "failed".to_string());
                    bar.abandon_with_message(message);
                }
                TaskStatus::Cancelled => {
                    summary.cancelled += 1;
                    bar.abandon_with_message("cancelled");
                }
                TaskStatus::Waiting => {}
            },
            TaskEvent::Error { message, .. } => {
                errors.insert(task_id, message);
            }
            TaskEvent::Log { line, .. } => debug!(task = %task_id, "{line}"),
            TaskEvent::Finished { .. } => {}
        }
    }

    summary
}
