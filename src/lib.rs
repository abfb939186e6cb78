//! mc-tasks - Download task tracking for a game launcher.
//!
//! Each job (say, installing game version 1.21.4) is a task made of a few
//! steps, its items. An external worker reports per-item progress events;
//! the registry folds them into task status, progress and registry-wide
//! aggregates that a UI can poll or subscribe to.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use mc_tasks::{JobPlan, SimulatedWorker, TaskConfig, TaskManager, TaskRegistry};
//!
//! # async fn example() -> mc_tasks::Result<()> {
//! let registry = TaskRegistry::new(TaskConfig::default());
//! let worker = SimulatedWorker::new(Duration::from_millis(50));
//! let mut manager = TaskManager::new(registry, Arc::new(worker));
//!
//! let outcome = manager.start_job(JobPlan::game_version("1.21.4"));
//! manager.run_until_idle().await;
//! outcome.wait().await?;
//!
//! println!("{}%", manager.registry().total_progress());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod manager;
pub mod notifier;
pub mod registry;
pub mod task;
pub mod worker;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use config::{AppConfig, PathConfig, TaskConfig};
pub use error::{Error, Result, WorkerError};
pub use event::{EventChannel, EventReceiver, EventSender, TaskEvent};
pub use format::{format_duration, format_percent, format_speed};
pub use manager::{JobOutcome, TaskManager};
pub use notifier::{Affordance, AffordanceMode, CompletionNotifier};
pub use registry::{JobHandle, NoObserver, RegistrySnapshot, TaskObserver, TaskRegistry};
pub use task::{
    ApplyOutcome, ItemId, ItemSpec, JobPlan, OrderingPolicy, ProgressStrategy, ProgressWeighting,
    Task, TaskId, TaskItem, TaskStatus,
};
pub use worker::{FailurePoint, JobRequest, JobWorker, SimulatedWorker};
