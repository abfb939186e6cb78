//! Progress events from the external worker and the per-job channel that
//! carries them.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::task::{ItemId, TaskId, TaskStatus};

/// Progress report for one task item, as emitted by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub item_id: ItemId,
    pub task_id: TaskId,
    /// Files left for the item; absent for items that don't count files.
    #[serde(default)]
    pub files_remaining: Option<u64>,
    /// Item progress in `0..=1`. Older workers call this `overall_progress`.
    #[serde(alias = "overall_progress")]
    pub progress: f64,
    pub status: TaskStatus,
    /// Transfer rate in bytes per second, `None` when the worker has no sample.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Per-item sequence number. Only consulted by the `drop_stale` policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl TaskEvent {
    /// Creates an event with no remaining count, speed or sequence number.
    #[must_use]
    pub const fn new(task_id: TaskId, item_id: ItemId, status: TaskStatus, progress: f64) -> Self {
        Self {
            item_id,
            task_id,
            files_remaining: None,
            progress,
            status,
            speed: None,
            seq: None,
        }
    }

    /// Shorthand for a fully completed item with nothing left.
    #[must_use]
    pub const fn completed(task_id: TaskId, item_id: ItemId) -> Self {
        Self::new(task_id, item_id, TaskStatus::Completed, 1.0)
            .with_remaining(0)
            .with_speed(0.0)
    }

    /// Sets the remaining file count.
    #[must_use]
    pub const fn with_remaining(mut self, remaining: u64) -> Self {
        self.files_remaining = Some(remaining);
        self
    }

    /// Sets the transfer speed.
    #[must_use]
    pub const fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Sets the per-item sequence number.
    #[must_use]
    pub const fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Parses and type-checks a raw JSON payload from the worker.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidEvent`] if a field is missing or has the
    /// wrong type (including negative ids and unknown status values).
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Factory for per-job event channels.
///
/// Every job gets its own channel so events can't be attributed to the wrong
/// job by channel identity. The task id is also checked on every event.
pub struct EventChannel;

impl EventChannel {
    /// Opens a fresh channel bound to `task_id`.
    #[must_use]
    pub fn open(task_id: TaskId) -> (EventSender, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            EventSender { task_id, tx },
            EventReceiver { task_id, rx },
        )
    }
}

/// Worker side of a job's event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    task_id: TaskId,
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl EventSender {
    /// The task this channel was opened for.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Sends an event. Returns `false` once the receiving side is gone.
    pub fn send(&self, event: TaskEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Validates a raw JSON payload and sends it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidEvent`] if the payload fails validation.
    /// A closed channel is not an error; the event is simply lost.
    pub fn send_json(&self, raw: &str) -> Result<()> {
        let event = TaskEvent::from_json(raw)?;
        if !self.send(event) {
            log::debug!("task {}: event channel closed, dropping event", self.task_id);
        }
        Ok(())
    }

    /// Returns true once the receiver has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Registry side of a job's event channel.
#[derive(Debug)]
pub struct EventReceiver {
    task_id: TaskId,
    rx: mpsc::UnboundedReceiver<TaskEvent>,
}

impl EventReceiver {
    /// The task this channel was opened for.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Waits for the next event addressed to this channel's task.
    ///
    /// Events carrying a different `task_id` are dropped. Returns `None` once
    /// every sender is gone and the buffer is drained.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        loop {
            let event = self.rx.recv().await?;
            if self.accepts(&event) {
                return Some(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<TaskEvent> {
        while let Ok(event) = self.rx.try_recv() {
            if self.accepts(&event) {
                return Some(event);
            }
        }
        None
    }

    fn accepts(&self, event: &TaskEvent) -> bool {
        if event.task_id == self.task_id {
            true
        } else {
            log::warn!(
                "channel for task {} received event for task {}, dropping",
                self.task_id,
                event.task_id
            );
            false
        }
    }
}
