//! The smallest trackable unit of work inside a task.

use serde::Serialize;

use super::{ItemId, TaskId, TaskStatus};
use crate::event::TaskEvent;

/// Description of an item at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec {
    pub name: String,
    /// Initial remaining count; `None` for items that don't count files.
    pub remaining: Option<u64>,
    /// Total bytes the item is expected to transfer, if known up front.
    pub total_size: Option<u64>,
}

impl ItemSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remaining: None,
            total_size: None,
        }
    }

    #[must_use]
    pub fn with_remaining(mut self, remaining: u64) -> Self {
        self.remaining = Some(remaining);
        self
    }

    #[must_use]
    pub fn with_total_size(mut self, bytes: u64) -> Self {
        self.total_size = Some(bytes);
        self
    }
}

/// One step of a task, e.g. "version jar".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskItem {
    id: ItemId,
    task_id: TaskId,
    name: String,
    status: TaskStatus,
    progress: f64,
    speed: Option<f64>,
    remaining: Option<u64>,
    total_size: Option<u64>,
    #[serde(skip)]
    last_seq: Option<u64>,
}

impl TaskItem {
    /// Creates a pending item from its spec.
    #[must_use]
    pub fn new(id: ItemId, task_id: TaskId, spec: ItemSpec) -> Self {
        Self {
            id,
            task_id,
            name: spec.name,
            status: TaskStatus::Pending,
            progress: 0.0,
            speed: None,
            remaining: spec.remaining,
            total_size: spec.total_size,
            last_seq: None,
        }
    }

    /// Overwrites status, progress, remaining and speed from `event`.
    ///
    /// Last write wins; no monotonicity check is made. Out-of-range numbers
    /// are clamped so a single bad report can't poison the aggregates.
    pub fn update(&mut self, event: &TaskEvent) {
        self.status = event.status;
        self.progress = clamp_progress(event.progress);
        self.remaining = event.files_remaining;
        self.speed = sanitize_speed(event.speed);
        if event.seq.is_some() {
            self.last_seq = event.seq;
        }
    }

    /// Returns true if `seq` is newer than the last sequenced event applied.
    #[must_use]
    pub fn is_newer(&self, seq: u64) -> bool {
        self.last_seq.is_none_or(|last| seq > last)
    }

    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    #[must_use]
    pub const fn progress(&self) -> f64 {
        self.progress
    }

    #[must_use]
    pub const fn speed(&self) -> Option<f64> {
        self.speed
    }

    #[must_use]
    pub const fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    #[must_use]
    pub const fn total_size(&self) -> Option<u64> {
        self.total_size
    }
}

/// NaN and negatives become 0, anything above 1 becomes 1.
fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Drops speeds that are not a finite, non-negative rate.
fn sanitize_speed(speed: Option<f64>) -> Option<f64> {
    speed.filter(|s| s.is_finite() && *s >= 0.0)
}
