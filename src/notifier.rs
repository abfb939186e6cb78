//! Hides the persistent "in progress" affordance once nothing is running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::registry::TaskObserver;
use crate::task::Task;

/// What the persistent affordance is currently showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AffordanceMode {
    /// The regular "start download" button.
    #[default]
    StartDownload,
    /// Pinned to the task management view; never auto-hidden.
    TaskManagement,
}

/// The UI element the notifier toggles. Owned by the presentation layer.
pub trait Affordance: Send + Sync {
    fn set_visible(&self, visible: bool);
}

impl<A: Affordance + ?Sized> Affordance for Arc<A> {
    fn set_visible(&self, visible: bool) {
        (**self).set_visible(visible);
    }
}

/// Registry observer that shows the affordance when a job starts and hides it
/// when the active task count drops to zero.
///
/// Both directions are edge-triggered: the affordance is only touched when
/// its visibility actually changes.
pub struct CompletionNotifier<A: Affordance> {
    affordance: A,
    visible: AtomicBool,
    pinned: AtomicBool,
}

impl<A: Affordance> CompletionNotifier<A> {
    /// Creates a notifier for an affordance that starts hidden.
    pub const fn new(affordance: A) -> Self {
        Self {
            affordance,
            visible: AtomicBool::new(false),
            pinned: AtomicBool::new(false),
        }
    }

    /// Tells the notifier which mode the affordance is in.
    pub fn set_mode(&self, mode: AffordanceMode) {
        self.pinned
            .store(mode == AffordanceMode::TaskManagement, Ordering::SeqCst);
    }

    #[must_use]
    pub fn mode(&self) -> AffordanceMode {
        if self.pinned.load(Ordering::SeqCst) {
            AffordanceMode::TaskManagement
        } else {
            AffordanceMode::StartDownload
        }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn show(&self) {
        if !self.visible.swap(true, Ordering::SeqCst) {
            self.affordance.set_visible(true);
        }
    }

    fn hide(&self) {
        if self.pinned.load(Ordering::SeqCst) {
            log::debug!("Affordance pinned to task management, keeping it");
            return;
        }
        if self.visible.swap(false, Ordering::SeqCst) {
            log::debug!("All tasks completed, hiding affordance");
            self.affordance.set_visible(false);
        }
    }
}

impl<A: Affordance> TaskObserver for CompletionNotifier<A> {
    fn on_task_started(&self, _task: &Task) {
        self.show();
    }

    fn on_all_tasks_completed(&self) {
        self.hide();
    }
}
