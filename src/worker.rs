//! The external worker port and a simulated implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::WorkerError;
use crate::event::{EventSender, TaskEvent};
use crate::task::{ItemId, TaskId, TaskStatus};

/// Job-start request sent to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRequest {
    pub subject_id: String,
    pub task_id: TaskId,
}

/// The component that actually downloads things.
///
/// `run` should emit zero or more events on `on_event` and resolve once the
/// whole job is done or has failed. The registry never awaits individual
/// events.
#[async_trait]
pub trait JobWorker: Send + Sync {
    async fn run(&self, request: JobRequest, on_event: EventSender) -> Result<(), WorkerError>;
}

/// Where a [`SimulatedWorker`] job gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// Reject before emitting anything, like an unreachable mirror.
    BeforeStart,
    /// Reject after the first item completes, like a checksum mismatch.
    AfterFirstItem,
}

/// A worker that fakes the three-step game version install.
///
/// Emits `Pending`, a few `Running` reports, then `Completed` for each of the
/// json, jar and libraries items, sleeping `tick` between reports.
#[derive(Debug, Clone)]
pub struct SimulatedWorker {
    tick: Duration,
    steps: u32,
    library_files: u64,
    failures: HashMap<String, FailurePoint>,
}

impl Default for SimulatedWorker {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl SimulatedWorker {
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            steps: 4,
            library_files: 12,
            failures: HashMap::new(),
        }
    }

    /// Number of `Running` reports per item.
    #[must_use]
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps.max(1);
        self
    }

    /// Number of files in the libraries item.
    #[must_use]
    pub const fn with_library_files(mut self, files: u64) -> Self {
        self.library_files = files;
        self
    }

    /// Makes jobs for `subject` fail at `point`.
    #[must_use]
    pub fn failing(mut self, subject: impl Into<String>, point: FailurePoint) -> Self {
        self.failures.insert(subject.into(), point);
        self
    }

    /// Runs one item through pending, running and completed.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    async fn run_item(&self, on_event: &EventSender, item_id: ItemId, files: u64, bytes_per_tick: f64) {
        let task_id = on_event.task_id();
        on_event.send(TaskEvent::new(task_id, item_id, TaskStatus::Pending, 0.0).with_remaining(files));
        for step in 1..self.steps {
            tokio::time::sleep(self.tick).await;
            let progress = f64::from(step) / f64::from(self.steps);
            let done = (files as f64 * progress).floor() as u64;
            on_event.send(
                TaskEvent::new(task_id, item_id, TaskStatus::Running, progress)
                    .with_remaining(files - done.min(files))
                    .with_speed(bytes_per_tick / self.tick.as_secs_f64().max(f64::EPSILON)),
            );
        }
        tokio::time::sleep(self.tick).await;
        on_event.send(TaskEvent::completed(task_id, item_id));
    }
}

#[async_trait]
impl JobWorker for SimulatedWorker {
    async fn run(&self, request: JobRequest, on_event: EventSender) -> Result<(), WorkerError> {
        log::info!(
            "Simulating download of {} for task {}",
            request.subject_id,
            request.task_id
        );
        let failure = self.failures.get(&request.subject_id).copied();
        if failure == Some(FailurePoint::BeforeStart) {
            return Err(WorkerError::new(format!(
                "failed to fetch version manifest for {}",
                request.subject_id
            )));
        }

        self.run_item(&on_event, 0, 1, 16.0 * 1024.0).await;
        if failure == Some(FailurePoint::AfterFirstItem) {
            on_event.send(TaskEvent::new(request.task_id, 1, TaskStatus::Failed, 0.0).with_remaining(1));
            return Err(WorkerError::new(format!(
                "sha1 check failed for {}.jar",
                request.subject_id
            )));
        }
        self.run_item(&on_event, 1, 1, 4.0 * 1024.0 * 1024.0).await;
        self.run_item(&on_event, 2, self.library_files, 1024.0 * 1024.0).await;
        Ok(())
    }
}
