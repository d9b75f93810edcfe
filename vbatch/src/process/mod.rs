//! External process control.
//!
//! A [`ProcessController`] owns at most one child at a time: it spawns the
//! encoder with stdout and stderr merged into a single line stream and
//! exposes kill/wait. OS-level suspend/resume goes through the shared
//! [`ProcessControl`] handle, which tracks the current child pid so the
//! scheduler can pause a worker's process without reaching into the worker.

mod platform;

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::debug;

use crate::command::CommandSpec;
use crate::error::{Error, Result};

pub use platform::NoWindowExt;

/// Shared view of a controller's current child. Safe to hold from other
/// tasks; suspend/resume act on whatever process is current, or no-op.
#[derive(Debug, Default)]
pub struct ProcessControl {
    /// Pid of the running child; 0 means none.
    pid: AtomicU32,
}

impl ProcessControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn set(&self, pid: Option<u32>) {
        self.pid.store(pid.unwrap_or(0), Ordering::SeqCst);
    }

    /// Pid of the current child, if one is running.
    pub fn current_pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Suspend the current child. No-op without one.
    pub fn suspend(&self) -> bool {
        match self.current_pid() {
            Some(pid) => platform::suspend_process(pid),
            None => false,
        }
    }

    /// Resume the current child. No-op without one.
    pub fn resume(&self) -> bool {
        match self.current_pid() {
            Some(pid) => platform::resume_process(pid),
            None => false,
        }
    }
}

/// Drives one child process at a time: spawn, stream merged output
/// line-by-line, kill, wait.
pub struct ProcessController {
    control: Arc<ProcessControl>,
    child: Option<Child>,
    lines: Option<mpsc::Receiver<String>>,
}

impl ProcessController {
    pub fn new(control: Arc<ProcessControl>) -> Self {
        Self {
            control,
            child: None,
            lines: None,
        }
    }

    /// Spawn the given invocation with stdout and stderr piped and merged
    /// into a single line stream.
    pub fn spawn(&mut self, spec: &CommandSpec) -> Result<()> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .env("LC_ALL", "C") // stable, locale-independent output
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd.no_window();

        let mut child = cmd.spawn().map_err(Error::Spawn)?;
        debug!("spawned {} (pid {:?})", spec.display(), child.id());

        let (tx, rx) = mpsc::channel(64);
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, tx);
        }

        self.control.set(child.id());
        self.child = Some(child);
        self.lines = Some(rx);
        Ok(())
    }

    /// Next line of merged output; `None` once both streams have closed.
    /// Bound to the current child, not restartable across spawns.
    pub async fn next_line(&mut self) -> Option<String> {
        match self.lines.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Kill the current child. Idempotent and safe with no child active.
    pub async fn kill(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.kill().await {
                debug!("kill after exit: {e}");
            }
        }
    }

    /// Wait for the current child to exit and reap it. Consumes the child;
    /// call exactly once per spawn.
    pub async fn wait(&mut self) -> Result<i32> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| Error::validation("no process to wait for"))?;
        let status = child.wait().await;
        self.control.set(None);
        self.lines = None;
        Ok(status?.code().unwrap_or(-1))
    }
}

fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}
