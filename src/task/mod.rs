//! Tasks, their items, and how item progress rolls up into a task.

mod item;
mod progress;
mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::TaskEvent;

pub use item::{ItemSpec, TaskItem};
pub use progress::{MeanProgress, ProgressStrategy, ProgressWeighting, SizeWeightedProgress};
pub use status::{TaskStatus, UnknownStatus};

/// Registry-assigned task identifier.
pub type TaskId = u64;

/// Item identifier, unique within its task.
pub type ItemId = u32;

/// How events that arrive out of order are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Apply every event as it arrives; a late event can regress progress.
    #[default]
    Trust,
    /// Drop sequenced events whose `seq` is not newer than the last one
    /// applied to the same item. Unsequenced events are always applied.
    DropStale,
}

/// The step decomposition of a job, supplied by whoever starts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    subject: String,
    items: Vec<ItemSpec>,
}

impl JobPlan {
    /// Creates an empty plan for `subject`.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            items: Vec::new(),
        }
    }

    /// Appends a step. Item ids follow insertion order, starting at 0.
    #[must_use]
    pub fn with_item(mut self, item: ItemSpec) -> Self {
        self.items.push(item);
        self
    }

    /// The standard three-step game version install: version json, client
    /// jar, then the library set.
    #[must_use]
    pub fn game_version(version_id: impl Into<String>) -> Self {
        Self::new(version_id)
            .with_item(ItemSpec::new("json download").with_remaining(1))
            .with_item(ItemSpec::new("version jar").with_remaining(1))
            .with_item(ItemSpec::new("libraries"))
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn items(&self) -> &[ItemSpec] {
        &self.items
    }
}

/// What applying an event to a task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The item was updated.
    Applied {
        /// The task became `Completed` with this event.
        completed_now: bool,
    },
    /// No task with the event's `task_id`. Only the registry reports this.
    UnknownTask,
    /// No item with the event's `item_id`.
    UnknownItem,
    /// Dropped by [`OrderingPolicy::DropStale`].
    Stale,
}

/// One user-initiated job, e.g. installing a game version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    id: TaskId,
    name: String,
    subject: String,
    status: TaskStatus,
    progress: f64,
    speed: f64,
    items: Vec<TaskItem>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Builds a task from its plan. A plan with no steps is complete at once,
    /// with progress 0 like any other empty item list.
    #[must_use]
    pub fn new(id: TaskId, plan: JobPlan) -> Self {
        let name = format!("{} download", plan.subject);
        let items: Vec<TaskItem> = (0..)
            .zip(plan.items)
            .map(|(item_id, spec)| TaskItem::new(item_id, id, spec))
            .collect();
        let now = Utc::now();
        let empty = items.is_empty();
        Self {
            id,
            name,
            subject: plan.subject,
            status: if empty {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            },
            progress: 0.0,
            speed: 0.0,
            items,
            created_at: now,
            finished_at: empty.then_some(now),
        }
    }

    /// Applies an item-scoped event and recomputes the derived fields.
    ///
    /// Never fails: unknown items and stale events are reported through the
    /// returned [`ApplyOutcome`] and leave the task untouched.
    pub fn apply(
        &mut self,
        event: &TaskEvent,
        strategy: &dyn ProgressStrategy,
        ordering: OrderingPolicy,
    ) -> ApplyOutcome {
        let Some(item) = self.items.iter_mut().find(|i| i.id() == event.item_id) else {
            return ApplyOutcome::UnknownItem;
        };
        if ordering == OrderingPolicy::DropStale
            && let Some(seq) = event.seq
            && !item.is_newer(seq)
        {
            return ApplyOutcome::Stale;
        }
        item.update(event);

        let was_completed = self.status.is_completed();
        self.status = derive_status(&self.items);
        self.progress = strategy.task_progress(&self.items);
        self.speed = saturating_speed_sum(self.items.iter().filter_map(TaskItem::speed));

        let completed_now = !was_completed && self.status.is_completed();
        if completed_now {
            self.finished_at = Some(Utc::now());
        } else if !self.status.is_completed() {
            self.finished_at = None;
        }
        ApplyOutcome::Applied { completed_now }
    }

    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The job subject, e.g. the version id.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.status.is_completed()
    }

    #[must_use]
    pub const fn progress(&self) -> f64 {
        self.progress
    }

    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    #[must_use]
    pub fn items(&self) -> &[TaskItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&TaskItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    /// Files left across all items; items without a count contribute 0.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.items
            .iter()
            .filter_map(TaskItem::remaining)
            .fold(0, u64::saturating_add)
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

/// Sums non-negative speeds, stopping at `f64::MAX` instead of overflowing
/// to infinity.
pub(crate) fn saturating_speed_sum(speeds: impl Iterator<Item = f64>) -> f64 {
    speeds.fold(0.0, |total, speed| (total + speed).min(f64::MAX))
}

/// `Completed` iff every item is; otherwise the most telling item state.
fn derive_status(items: &[TaskItem]) -> TaskStatus {
    if items.iter().all(|i| i.status().is_completed()) {
        TaskStatus::Completed
    } else if items.iter().any(|i| i.status() == TaskStatus::Failed) {
        TaskStatus::Failed
    } else if items.iter().any(|i| i.status() != TaskStatus::Pending) {
        TaskStatus::Running
    } else {
        TaskStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(task: &mut Task, event: &TaskEvent) -> ApplyOutcome {
        task.apply(event, &MeanProgress, OrderingPolicy::Trust)
    }

    #[test]
    fn game_version_plan() {
        let task = Task::new(0, JobPlan::game_version("1.21.4"));
        assert_eq!(task.name(), "1.21.4 download");
        assert_eq!(task.subject(), "1.21.4");
        assert_eq!(task.status(), TaskStatus::Pending);
        let items: Vec<_> = task
            .items()
            .iter()
            .map(|i| (i.id(), i.name().to_string(), i.remaining()))
            .collect();
        assert_eq!(
            items,
            vec![
                (0, "json download".to_string(), Some(1)),
                (1, "version jar".to_string(), Some(1)),
                (2, "libraries".to_string(), None),
            ]
        );
        assert_eq!(task.remaining(), 2);
        assert!(task.items().iter().all(|i| i.task_id() == 0));
    }

    #[test]
    fn unknown_item_is_ignored() {
        let mut task = Task::new(0, JobPlan::game_version("1.20"));
        let before = task.clone();
        assert_eq!(
            apply(&mut task, &TaskEvent::completed(0, 42)),
            ApplyOutcome::UnknownItem
        );
        assert_eq!(task, before);
    }

    #[test]
    fn derives_progress_and_speed() {
        let mut task = Task::new(0, JobPlan::game_version("1.20"));
        apply(
            &mut task,
            &TaskEvent::new(0, 0, TaskStatus::Running, 0.5).with_speed(100.0),
        );
        apply(
            &mut task,
            &TaskEvent::new(0, 1, TaskStatus::Running, 0.25).with_speed(50.0),
        );
        assert_eq!(task.status(), TaskStatus::Running);
        assert!((task.progress() - 0.25).abs() < 1e-12);
        assert!((task.speed() - 150.0).abs() < 1e-12);
    }

    #[test]
    fn completes_only_when_every_item_completes() {
        let mut task = Task::new(0, JobPlan::game_version("1.21.4"));
        assert_eq!(
            apply(&mut task, &TaskEvent::completed(0, 0)),
            ApplyOutcome::Applied {
                completed_now: false
            }
        );
        apply(&mut task, &TaskEvent::completed(0, 1));
        assert!(task.is_active());
        assert!(task.finished_at().is_none());
        assert_eq!(
            apply(&mut task, &TaskEvent::completed(0, 2)),
            ApplyOutcome::Applied {
                completed_now: true
            }
        );
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.progress(), 1.0);
        assert!(task.finished_at().is_some());

        // a duplicate completion doesn't re-fire
        assert_eq!(
            apply(&mut task, &TaskEvent::completed(0, 2)),
            ApplyOutcome::Applied {
                completed_now: false
            }
        );
    }

    #[test]
    fn regressed_item_reopens_task() {
        let mut task = Task::new(0, JobPlan::new("solo").with_item(ItemSpec::new("only")));
        apply(&mut task, &TaskEvent::completed(0, 0));
        assert_eq!(task.status(), TaskStatus::Completed);
        apply(&mut task, &TaskEvent::new(0, 0, TaskStatus::Running, 0.9));
        assert_eq!(task.status(), TaskStatus::Running);
        assert!(task.finished_at().is_none());
    }

    #[test]
    fn failed_item_marks_task_failed_but_active() {
        let mut task = Task::new(0, JobPlan::game_version("1.20"));
        apply(&mut task, &TaskEvent::completed(0, 0));
        apply(&mut task, &TaskEvent::new(0, 1, TaskStatus::Failed, 0.3));
        assert_eq!(task.status(), TaskStatus::Failed);
        assert!(task.is_active());
    }

    #[test]
    fn drop_stale_policy_skips_old_events() {
        let mut task = Task::new(0, JobPlan::game_version("1.20"));
        let newer = TaskEvent::new(0, 1, TaskStatus::Running, 0.8).with_seq(5);
        let older = TaskEvent::new(0, 1, TaskStatus::Running, 0.2).with_seq(3);
        task.apply(&newer, &MeanProgress, OrderingPolicy::DropStale);
        assert_eq!(
            task.apply(&older, &MeanProgress, OrderingPolicy::DropStale),
            ApplyOutcome::Stale
        );
        assert_eq!(task.item(1).unwrap().progress(), 0.8);

        // trust policy applies it anyway
        task.apply(&older, &MeanProgress, OrderingPolicy::Trust);
        assert_eq!(task.item(1).unwrap().progress(), 0.2);
    }

    #[test]
    fn empty_plan_is_complete_immediately() {
        let task = Task::new(7, JobPlan::new("nothing"));
        assert_eq!(task.status(), TaskStatus::Completed);
        assert!(!task.is_active());
        assert_eq!(task.remaining(), 0);
        assert_eq!(task.progress(), 0.0);
        assert!(task.finished_at().is_some());
    }

    #[test]
    fn remaining_saturates_instead_of_overflowing() {
        let mut task = Task::new(0, JobPlan::game_version("1.21.4"));
        apply(
            &mut task,
            &TaskEvent::new(0, 0, TaskStatus::Running, 0.1).with_remaining(u64::MAX),
        );
        apply(
            &mut task,
            &TaskEvent::new(0, 1, TaskStatus::Running, 0.1).with_remaining(1),
        );
        assert_eq!(task.remaining(), u64::MAX);
    }

    #[test]
    fn huge_speeds_stay_finite() {
        let mut task = Task::new(0, JobPlan::game_version("1.21.4"));
        apply(
            &mut task,
            &TaskEvent::new(0, 0, TaskStatus::Running, 0.1).with_speed(1e308),
        );
        apply(
            &mut task,
            &TaskEvent::new(0, 1, TaskStatus::Running, 0.1).with_speed(1e308),
        );
        assert!(task.speed().is_finite());
        assert_eq!(task.speed(), f64::MAX);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn event() -> impl Strategy<Value = TaskEvent> {
            (0u32..4, 0u8..4, 0.0f64..=1.0, proptest::option::of(0.0f64..1e6)).prop_map(
                |(item_id, status, progress, speed)| TaskEvent {
                    item_id,
                    task_id: 0,
                    files_remaining: None,
                    progress,
                    status: TaskStatus::try_from(status).unwrap(),
                    speed,
                    seq: None,
                },
            )
        }

        proptest! {
            #[test]
            fn completed_iff_all_items_completed(events in proptest::collection::vec(event(), 0..40)) {
                let mut task = Task::new(0, JobPlan::game_version("1.21.4"));
                for e in &events {
                    apply(&mut task, e);
                    let all_done = task.items().iter().all(|i| i.status().is_completed());
                    prop_assert_eq!(task.status().is_completed(), all_done);
                }
            }

            #[test]
            fn progress_stays_finite_and_bounded(events in proptest::collection::vec(event(), 0..40)) {
                let mut task = Task::new(0, JobPlan::game_version("1.21.4"));
                for e in &events {
                    apply(&mut task, e);
                }
                prop_assert!(task.progress().is_finite());
                prop_assert!((0.0..=1.0).contains(&task.progress()));
                prop_assert!(task.speed() >= 0.0);
            }
        }
    }
}
