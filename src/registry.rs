//! The task registry: owns every task, routes events to them and derives the
//! registry-wide aggregates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::config::TaskConfig;
use crate::error::{Error, Result, WorkerError};
use crate::event::{EventChannel, EventReceiver, EventSender, TaskEvent};
use crate::task::{ApplyOutcome, JobPlan, ProgressStrategy, Task, TaskId, saturating_speed_sum};

/// Trait for receiving registry notifications.
///
/// All methods have default no-op implementations. Observers are called
/// synchronously from inside the mutating call, after the state change.
pub trait TaskObserver: Send + Sync {
    /// Called after a task has been registered.
    fn on_task_started(&self, _task: &Task) {}

    /// Called after an event was applied to a task.
    fn on_task_updated(&self, _task: &Task) {}

    /// Called once when a task transitions to `Completed`.
    fn on_task_completed(&self, _task: &Task) {}

    /// Called when no active task remains: either the last one just completed
    /// or a job finished while the count was already zero.
    fn on_all_tasks_completed(&self) {}

    /// Called when a job's worker invocation was rejected.
    fn on_job_failed(&self, _task_id: TaskId, _error: &Error) {}
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObserver;

impl TaskObserver for NoObserver {}

/// Both ends of a freshly opened job channel.
#[derive(Debug)]
pub struct JobHandle {
    pub task_id: TaskId,
    /// Handed to the worker.
    pub sender: EventSender,
    /// Drained by whoever applies events to the registry.
    pub receiver: EventReceiver,
}

/// Read-only copy of the registry for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub tasks: Vec<Task>,
    pub total_progress: f64,
    pub total_speed: f64,
    pub total_remaining: u64,
    pub active_task_count: usize,
}

/// Owns all tasks. The only component that mutates task or item state.
pub struct TaskRegistry {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
    current_task_id: Option<TaskId>,
    /// Tasks that have had at least one event applied.
    reported: HashSet<TaskId>,
    config: TaskConfig,
    strategy: Arc<dyn ProgressStrategy>,
    observers: Vec<Arc<dyn TaskObserver>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(TaskConfig::default())
    }
}

impl TaskRegistry {
    /// Creates an empty registry using the weighting named in `config`.
    #[must_use]
    pub fn new(config: TaskConfig) -> Self {
        let strategy = config.progress_weighting.strategy();
        Self::with_strategy(config, strategy)
    }

    /// Creates an empty registry with a custom progress strategy.
    #[must_use]
    pub fn with_strategy(config: TaskConfig, strategy: Arc<dyn ProgressStrategy>) -> Self {
        Self {
            tasks: HashMap::new(),
            order: Vec::new(),
            current_task_id: None,
            reported: HashSet::new(),
            config,
            strategy,
            observers: Vec::new(),
        }
    }

    /// Registers an observer for task notifications.
    pub fn subscribe(&mut self, observer: Arc<dyn TaskObserver>) {
        self.observers.push(observer);
    }

    #[must_use]
    pub const fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Registers a new task for `plan` and opens its event channel.
    ///
    /// The task is in the registry before this returns, so events for it
    /// can be applied as soon as the caller hands the sender to a worker.
    pub fn start_job(&mut self, plan: JobPlan) -> JobHandle {
        let task_id = self.current_task_id.map_or(0, |id| id + 1);
        self.current_task_id = Some(task_id);

        let task = Task::new(task_id, plan);
        log::info!("Task {task_id} started: {}", task.name());
        self.tasks.insert(task_id, task);
        self.order.push(task_id);

        if let Some(task) = self.tasks.get(&task_id) {
            for observer in &self.observers {
                observer.on_task_started(task);
            }
        }

        let (sender, receiver) = EventChannel::open(task_id);
        JobHandle {
            task_id,
            sender,
            receiver,
        }
    }

    /// Routes an event to its task.
    ///
    /// Unknown task or item ids are dropped, never an error: the worker is a
    /// separate, possibly out-of-date component.
    pub fn apply_event(&mut self, event: &TaskEvent) -> ApplyOutcome {
        let Some(task) = self.tasks.get_mut(&event.task_id) else {
            log::debug!("Dropping event for unknown task {}", event.task_id);
            return ApplyOutcome::UnknownTask;
        };

        let outcome = task.apply(event, self.strategy.as_ref(), self.config.ordering);
        match outcome {
            ApplyOutcome::Applied { completed_now } => {
                self.reported.insert(event.task_id);
                for observer in &self.observers {
                    observer.on_task_updated(task);
                }
                if completed_now {
                    log::info!("Task {} completed: {}", task.id(), task.name());
                    for observer in &self.observers {
                        observer.on_task_completed(task);
                    }
                    if self.active_task_count() == 0 {
                        self.notify_all_completed();
                    }
                }
            }
            ApplyOutcome::UnknownItem => {
                log::debug!(
                    "Dropping event for unknown item {} of task {}",
                    event.item_id,
                    event.task_id
                );
            }
            ApplyOutcome::Stale => {
                log::debug!(
                    "Dropping stale event {:?} for item {} of task {}",
                    event.seq,
                    event.item_id,
                    event.task_id
                );
            }
            ApplyOutcome::UnknownTask => {}
        }
        outcome
    }

    /// Applies every event already queued on `receiver`. Returns how many
    /// were applied.
    pub fn drain(&mut self, receiver: &mut EventReceiver) -> usize {
        let mut applied = 0;
        while let Some(event) = receiver.try_recv() {
            if matches!(self.apply_event(&event), ApplyOutcome::Applied { .. }) {
                applied += 1;
            }
        }
        applied
    }

    /// Records the worker's verdict for a job.
    ///
    /// A rejection becomes [`Error::WorkerNotStarted`] if no event was ever
    /// applied to the task, [`Error::WorkerFailed`] otherwise. The task keeps
    /// whatever state its last events produced.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the worker rejected the job.
    pub fn finish_job(
        &mut self,
        task_id: TaskId,
        result: std::result::Result<(), WorkerError>,
    ) -> Result<()> {
        let outcome = match result {
            Ok(()) => {
                log::info!("Task {task_id}: worker finished");
                Ok(())
            }
            Err(WorkerError(reason)) => {
                let error = if self.reported.contains(&task_id) {
                    Error::WorkerFailed { task_id, reason }
                } else {
                    Error::WorkerNotStarted { task_id, reason }
                };
                log::error!("{error}");
                for observer in &self.observers {
                    observer.on_job_failed(task_id, &error);
                }
                Err(error)
            }
        };
        if self.active_task_count() == 0 {
            self.notify_all_completed();
        }
        outcome
    }

    fn notify_all_completed(&self) {
        log::debug!("No active tasks remain");
        for observer in &self.observers {
            observer.on_all_tasks_completed();
        }
    }

    /// Tasks in the order they were started.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Mean task progress as a percentage, rounded to the configured
    /// precision. An empty registry reports `0.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    pub fn total_progress(&self) -> f64 {
        if self.order.is_empty() {
            return 0.0;
        }
        let mean = self.tasks().map(Task::progress).sum::<f64>() / self.order.len() as f64;
        let scale = 10f64.powi(self.config.progress_precision.min(15) as i32);
        (mean * 100.0 * scale).round() / scale
    }

    /// Sum of task speeds, capped at `f64::MAX`.
    #[must_use]
    pub fn total_speed(&self) -> f64 {
        saturating_speed_sum(self.tasks().map(Task::speed))
    }

    /// Files left across every item of every task, saturating at `u64::MAX`.
    #[must_use]
    pub fn total_remaining(&self) -> u64 {
        self.tasks()
            .map(Task::remaining)
            .fold(0, u64::saturating_add)
    }

    /// Number of tasks that are not `Completed`.
    #[must_use]
    pub fn active_task_count(&self) -> usize {
        self.tasks().filter(|t| t.is_active()).count()
    }

    /// Copies the current state and aggregates.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            tasks: self.tasks().cloned().collect(),
            total_progress: self.total_progress(),
            total_speed: self.total_speed(),
            total_remaining: self.total_remaining(),
            active_task_count: self.active_task_count(),
        }
    }

    /// Removes completed tasks from history. Ids are never reused.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.order.len();
        let tasks = &mut self.tasks;
        let reported = &mut self.reported;
        self.order.retain(|id| {
            let keep = tasks.get(id).is_some_and(Task::is_active);
            if !keep {
                tasks.remove(id);
                reported.remove(id);
            }
            keep
        });
        let removed = before - self.order.len();
        if removed > 0 {
            log::info!("Cleared {removed} completed task(s)");
        }
        removed
    }
}
