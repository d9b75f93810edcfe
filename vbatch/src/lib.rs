//! Batch video transcoding engine.
//!
//! vbatch drives an external ffmpeg binary through a per-task pipeline
//! (duration probe → optional stabilization analysis → filtered encode)
//! under a bounded worker pool. Callers submit fully-resolved [`Task`]
//! descriptors to a [`Scheduler`] and observe progress, status changes and
//! raw encoder output on a single typed event stream; in-flight work can be
//! paused, resumed and cancelled as a pool.

pub mod command;
pub mod config;
pub mod encoder;
pub mod error;
pub mod events;
pub mod process;
pub mod progress;
pub mod scheduler;
pub mod task;
pub mod worker;

pub use config::SchedulerConfig;
pub use error::{Error, Result};
pub use events::{EventSender, TaskEvent};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use task::{ContainerFormat, QualityTier, Rotation, Task, TaskStatus};
