//! Scheduler command messages.

use tokio::sync::oneshot;

use crate::task::Task;

/// Commands accepted by the scheduling loop. All registry mutation happens
/// on the loop task; callers only ever send these.
#[derive(Debug)]
pub(crate) enum SchedulerCommand {
    /// Enqueue a task for admission.
    Submit(Box<Task>),
    /// Change the concurrency cap for future admissions. Already validated
    /// by the handle.
    SetConcurrency(usize),
    /// Suspend every active worker's current process.
    PauseAll,
    /// Resume every active worker's current process.
    ResumeAll,
    /// Cancel all active workers and drop every task still in admission.
    CancelAll,
    /// Cancel everything, then stop the loop and acknowledge.
    Shutdown(oneshot::Sender<()>),
}
