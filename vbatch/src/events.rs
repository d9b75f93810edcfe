//! Task lifecycle event surface.
//!
//! Workers report everything the caller can observe through one typed
//! channel: status changes, rising progress percentages, raw encoder output
//! lines, and exactly one terminal notification per task (`Finished` on
//! success, `Error` on failure, neither for cancellation).

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::task::TaskStatus;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Events emitted while tasks move through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskEvent {
    /// The task entered a new status.
    StatusChanged { task_id: Uuid, status: TaskStatus },
    /// Progress percentage rose. Emitted only while the total duration is
    /// known; absent entirely for sources that do not report one.
    Progress { task_id: Uuid, percent: u8 },
    /// Terminal success notification; exactly once, only after `Completed`.
    Finished { task_id: Uuid },
    /// Terminal failure notification; exactly once, only after `Failed`.
    Error { task_id: Uuid, message: String },
    /// One raw line of encoder output, diagnostic only.
    Log { task_id: Uuid, line: String },
}

impl TaskEvent {
    /// Id of the task this event belongs to.
    pub fn task_id(&self) -> Uuid {
        match self {
            Self::StatusChanged { task_id, .. }
            | Self::Progress { task_id, .. }
            | Self::Finished { task_id }
            | Self::Error { task_id, .. }
            | Self::Log { task_id, .. } => *task_id,
        }
    }
}

/// Cloneable sending side of the event stream, handed to every worker.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<TaskEvent>,
}

impl EventSender {
    /// Create a sender/receiver pair.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TaskEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// A sender whose events go nowhere. Useful in tests and for callers
    /// that only care about final task state.
    pub fn noop() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }

    /// Deliver one event. A caller that dropped its receiver simply stops
    /// observing; workers keep running.
    pub async fn emit(&self, event: TaskEvent) {
        let _ = self.tx.send(event).await;
    }

    pub async fn status(&self, task_id: Uuid, status: TaskStatus) {
        self.emit(TaskEvent::StatusChanged { task_id, status }).await;
    }

    pub async fn progress(&self, task_id: Uuid, percent: u8) {
        self.emit(TaskEvent::Progress { task_id, percent }).await;
    }

    pub async fn finished(&self, task_id: Uuid) {
        self.emit(TaskEvent::Finished { task_id }).await;
    }

    pub async fn error(&self, task_id: Uuid, message: impl Into<String>) {
        self.emit(TaskEvent::Error {
            task_id,
            message: message.into(),
        })
        .await;
    }

    pub async fn log(&self, task_id: Uuid, line: impl Into<String>) {
        self.emit(TaskEvent::Log {
            task_id,
            line: line.into(),
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, mut rx) = EventSender::channel(8);
        let id = Uuid::new_v4();

        tx.status(id, TaskStatus::Running).await;
        tx.progress(id, 50).await;
        tx.finished(id).await;

        assert_eq!(
            rx.recv().await,
            Some(TaskEvent::StatusChanged {
                task_id: id,
                status: TaskStatus::Running
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(TaskEvent::Progress {
                task_id: id,
                percent: 50
            })
        );
        assert_eq!(rx.recv().await, Some(TaskEvent::Finished { task_id: id }));
    }

    #[tokio::test]
    async fn test_noop_sender_does_not_block() {
        let tx = EventSender::noop();
        let id = Uuid::new_v4();
        for i in 0..10 {
            tx.progress(id, i).await;
        }
    }

    #[test]
    fn test_task_id_accessor() {
        let id = Uuid::new_v4();
        let event = TaskEvent::Error {
            task_id: id,
            message: "x".into(),
        };
        assert_eq!(event.task_id(), id);
    }

    #[test]
    fn test_event_json_shape() {
        // Events are tagged for consumers that forward them as JSON.
        let id = Uuid::nil();
        let json = serde_json::to_value(TaskEvent::Progress {
            task_id: id,
            percent: 42,
        })
        .unwrap();
        assert_eq!(json["kind"], "progress");
        assert_eq!(json["percent"], 42);
        assert_eq!(json["task_id"], id.to_string());

        let json = serde_json::to_value(TaskEvent::StatusChanged {
            task_id: id,
            status: TaskStatus::Completed,
        })
        .unwrap();
        assert_eq!(json["status"], "completed");
    }
}
