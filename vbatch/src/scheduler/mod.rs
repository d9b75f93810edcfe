//! Bounded transcode scheduler.
//!
//! A single loop owns the admission queue and the active-worker registry,
//! fed by a command channel; callers hold a cloneable [`SchedulerHandle`].
//! Keeping every registry mutation on one task means pause/cancel fan-out
//! never races admission or retirement, with no locking at all.

mod messages;

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{SchedulerConfig, validate_concurrency};
use crate::error::{Error, Result};
use crate::events::{EventSender, TaskEvent};
use crate::process::ProcessControl;
use crate::task::{Task, TaskStatus};
use crate::worker::Worker;

use messages::SchedulerCommand;

/// Capacity of the command channel between handles and the loop.
const COMMAND_CHANNEL_CAPACITY: usize = 128;

/// An admitted task's control surface, owned exclusively by the loop.
struct ActiveWorker {
    cancel: CancellationToken,
    control: Arc<ProcessControl>,
}

/// Bounded pool of transcode workers.
pub struct Scheduler;

impl Scheduler {
    /// Start the scheduling loop. Returns the caller handle and the event
    /// stream carrying every task's lifecycle. Dropping the last handle
    /// tears the pool down, cancelling outstanding work.
    pub fn start(
        binary: impl Into<PathBuf>,
        config: SchedulerConfig,
    ) -> Result<(SchedulerHandle, mpsc::Receiver<TaskEvent>)> {
        config.validate()?;

        let (events, event_rx) = EventSender::channel(config.event_capacity);
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (retire_tx, retire_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let binary = binary.into();
        info!(
            "starting scheduler: encoder {}, up to {} concurrent tasks",
            binary.display(),
            config.max_concurrency
        );

        let scheduler_loop = SchedulerLoop {
            binary,
            cap: config.max_concurrency,
            paused: false,
            pending: VecDeque::new(),
            active: HashMap::new(),
            events,
            retire_tx,
            retire_rx,
            cmd_rx,
        };
        tokio::spawn(scheduler_loop.run());

        Ok((SchedulerHandle { cmd_tx }, event_rx))
    }
}

/// Cloneable handle to a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    cmd_tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Submit a task; it runs once an execution slot frees up.
    pub async fn submit(&self, task: Task) -> Result<()> {
        self.send(SchedulerCommand::Submit(Box::new(task))).await
    }

    /// Change the concurrency cap for future admissions. Running tasks are
    /// never preempted, even when the new cap is lower.
    pub async fn set_concurrency(&self, cap: usize) -> Result<()> {
        validate_concurrency(cap)?;
        self.send(SchedulerCommand::SetConcurrency(cap)).await
    }

    /// Suspend the processes of all running tasks. Tasks still waiting for
    /// a slot are unaffected and will start unpaused once admitted.
    pub async fn pause_all(&self) -> Result<()> {
        self.send(SchedulerCommand::PauseAll).await
    }

    /// Resume previously suspended processes.
    pub async fn resume_all(&self) -> Result<()> {
        self.send(SchedulerCommand::ResumeAll).await
    }

    /// Cancel every running task and drop all tasks still in admission.
    pub async fn cancel_all(&self) -> Result<()> {
        self.send(SchedulerCommand::CancelAll).await
    }

    /// Cancel outstanding work and stop the scheduling loop. Resolves once
    /// the loop has acknowledged.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SchedulerCommand::Shutdown(tx)).await?;
        rx.await.map_err(|_| Error::SchedulerStopped)
    }

    async fn send(&self, cmd: SchedulerCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| Error::SchedulerStopped)
    }
}

struct SchedulerLoop {
    binary: PathBuf,
    cap: usize,
    paused: bool,
    pending: VecDeque<Task>,
    active: HashMap<Uuid, ActiveWorker>,
    events: EventSender,
    /// Handed to each spawned worker task to report its terminal state.
    retire_tx: mpsc::Sender<Uuid>,
    retire_rx: mpsc::Receiver<Uuid>,
    cmd_rx: mpsc::Receiver<SchedulerCommand>,
}

impl SchedulerLoop {
    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd).await {
                            break;
                        }
                    }
                    // Every handle is gone: service teardown.
                    None => {
                        self.cancel_all().await;
                        break;
                    }
                },
                Some(id) = self.retire_rx.recv() => {
                    // A cancel-all may already have removed this entry.
                    self.active.remove(&id);
                    self.admit();
                }
            }
        }
        debug!("scheduler loop stopped");
    }

    /// Returns `true` when the loop should stop.
    async fn handle_command(&mut self, cmd: SchedulerCommand) -> bool {
        match cmd {
            SchedulerCommand::Submit(task) => {
                debug!(task = %task.id, "queued {}", task.source.display());
                self.pending.push_back(*task);
                self.admit();
            }
            SchedulerCommand::SetConcurrency(cap) => {
                info!("concurrency cap {} -> {}", self.cap, cap);
                self.cap = cap;
                self.admit();
            }
            SchedulerCommand::PauseAll => {
                self.paused = true;
                for worker in self.active.values() {
                    worker.control.suspend();
                }
                info!("paused {} active tasks", self.active.len());
            }
            SchedulerCommand::ResumeAll => {
                self.paused = false;
                for worker in self.active.values() {
                    worker.control.resume();
                }
                info!("resumed {} active tasks", self.active.len());
            }
            SchedulerCommand::CancelAll => self.cancel_all().await,
            SchedulerCommand::Shutdown(ack) => {
                self.cancel_all().await;
                let _ = ack.send(());
                return true;
            }
        }
        false
    }

    /// Admit pending tasks while slots are free. Admission is FIFO, so no
    /// task waits forever under a stable cap.
    fn admit(&mut self) {
        while self.active.len() < self.cap {
            let Some(task) = self.pending.pop_front() else {
                break;
            };
            let id = task.id;
            if self.paused {
                // Pause only suspends processes that are already running;
                // a task admitted afterwards starts unpaused.
                debug!(task = %id, "admitting while pool is paused; task starts running");
            }
            let cancel = CancellationToken::new();
            let control = ProcessControl::new();
            self.active.insert(
                id,
                ActiveWorker {
                    cancel: cancel.clone(),
                    control: control.clone(),
                },
            );

            let worker = Worker::new(
                task,
                self.binary.clone(),
                self.events.clone(),
                cancel,
                control,
            );
            let retire = self.retire_tx.clone();
            tokio::spawn(async move {
                let status = worker.run().await;
                debug!(task = %id, "worker finished: {status}");
                let _ = retire.send(id).await;
            });
        }
    }

    /// Kill everything in flight and drop the admission queue. Pending
    /// tasks are reported cancelled without ever having spawned a process.
    async fn cancel_all(&mut self) {
        info!(
            "cancelling {} active and {} pending tasks",
            self.active.len(),
            self.pending.len()
        );
        self.paused = false;
        for (_, worker) in self.active.drain() {
            // SIGKILL reaches the child even while it sits suspended.
            worker.cancel.cancel();
        }
        for task in self.pending.drain(..) {
            self.events.status(task.id, TaskStatus::Cancelled).await;
        }
    }
}
