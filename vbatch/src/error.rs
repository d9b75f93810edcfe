//! Crate-wide error types.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The encoder binary could not be launched at all.
    #[error("failed to launch encoder: {0}")]
    Spawn(#[source] std::io::Error),

    /// A pipeline stage exited with a non-zero status. Detailed diagnostics
    /// travel on the task's log stream, not in this message.
    #[error("encoder exited with status {code}")]
    ProcessExit { code: i32 },

    #[error("validation error: {0}")]
    Validation(String),

    /// The scheduling loop is gone; no further commands can be delivered.
    #[error("scheduler is not running")]
    SchedulerStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
