//! Error types for the mc-tasks library.

use thiserror::Error;

use crate::task::TaskId;

/// Errors surfaced to callers of the task engine.
///
/// Per-item and per-task problems (unknown ids, bad numbers) are absorbed by
/// the registry and never show up here. Only job-level failures and
/// configuration problems do.
#[derive(Error, Debug)]
pub enum Error {
    /// The worker rejected the job before any progress was reported for it.
    #[error("task {task_id}: worker never started: {reason}")]
    WorkerNotStarted {
        /// Task the job was started for.
        task_id: TaskId,
        /// Reason reported by the worker.
        reason: String,
    },

    /// The worker reported progress and then rejected the job.
    #[error("task {task_id}: worker failed: {reason}")]
    WorkerFailed {
        /// Task the job was started for.
        task_id: TaskId,
        /// Reason reported by the worker.
        reason: String,
    },

    /// The task manager shut down before the job outcome was delivered.
    #[error("task {0}: manager stopped before the job finished")]
    ChannelClosed(TaskId),

    /// A raw worker payload failed type validation.
    #[error("Invalid task event: {0}")]
    InvalidEvent(#[from] serde_json::Error),

    /// The configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error while reading or writing configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejection returned by a worker invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct WorkerError(pub String);

impl WorkerError {
    /// Creates a worker error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A specialized `Result` type for mc-tasks operations.
pub type Result<T> = std::result::Result<T, Error>;
