//! The event loop that owns the registry and drives worker jobs.
//!
//! Workers run on spawned tokio tasks and only talk to the loop through
//! channels. Every message is applied to the registry by the loop owner, one
//! at a time, so no handler ever observes a half-applied event.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result, WorkerError};
use crate::event::{EventReceiver, TaskEvent};
use crate::registry::{JobHandle, TaskObserver, TaskRegistry};
use crate::task::{JobPlan, TaskId};
use crate::worker::{JobRequest, JobWorker};

/// Messages from job tasks to the loop.
#[derive(Debug)]
enum JobMessage {
    Event(TaskEvent),
    Finished {
        task_id: TaskId,
        result: std::result::Result<(), WorkerError>,
    },
}

/// Resolves once the worker invocation for a job has settled.
#[derive(Debug)]
pub struct JobOutcome {
    task_id: TaskId,
    rx: oneshot::Receiver<Result<()>>,
}

impl JobOutcome {
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Waits for the job to finish. The manager loop must keep running for
    /// this to resolve.
    ///
    /// # Errors
    ///
    /// Returns the worker failure, or [`Error::ChannelClosed`] if the manager
    /// was dropped first.
    pub async fn wait(self) -> Result<()> {
        self.rx
            .await
            .unwrap_or(Err(Error::ChannelClosed(self.task_id)))
    }
}

/// Owns the [`TaskRegistry`] and multiplexes every job's event channel.
pub struct TaskManager {
    registry: TaskRegistry,
    worker: Arc<dyn JobWorker>,
    tx: mpsc::UnboundedSender<JobMessage>,
    rx: mpsc::UnboundedReceiver<JobMessage>,
    outcomes: HashMap<TaskId, oneshot::Sender<Result<()>>>,
}

impl TaskManager {
    #[must_use]
    pub fn new(registry: TaskRegistry, worker: Arc<dyn JobWorker>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            registry,
            worker,
            tx,
            rx,
            outcomes: HashMap::new(),
        }
    }

    /// Read-only access to the registry and its aggregates.
    #[must_use]
    pub const fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Registers an observer on the underlying registry.
    pub fn subscribe(&mut self, observer: Arc<dyn TaskObserver>) {
        self.registry.subscribe(observer);
    }

    /// Removes completed tasks from the registry.
    pub fn clear_completed(&mut self) -> usize {
        self.registry.clear_completed()
    }

    /// Number of jobs whose worker call hasn't settled yet.
    #[must_use]
    pub fn running_jobs(&self) -> usize {
        self.outcomes.len()
    }

    /// Starts a job: registers its task, then issues the worker request.
    ///
    /// Returns immediately. Must be called from within a tokio runtime.
    pub fn start_job(&mut self, plan: JobPlan) -> JobOutcome {
        let subject_id = plan.subject().to_string();
        let JobHandle {
            task_id,
            sender,
            receiver,
        } = self.registry.start_job(plan);

        let (outcome_tx, outcome_rx) = oneshot::channel();
        self.outcomes.insert(task_id, outcome_tx);

        let request = JobRequest {
            subject_id,
            task_id,
        };
        let worker = Arc::clone(&self.worker);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let run = worker.run(request, sender);
            forward_job(task_id, run, receiver, tx).await;
        });

        JobOutcome {
            task_id,
            rx: outcome_rx,
        }
    }

    fn handle(&mut self, message: JobMessage) {
        match message {
            JobMessage::Event(event) => {
                self.registry.apply_event(&event);
            }
            JobMessage::Finished { task_id, result } => {
                let outcome = self.registry.finish_job(task_id, result);
                if let Some(tx) = self.outcomes.remove(&task_id) {
                    // the caller may have dropped its JobOutcome
                    let _ = tx.send(outcome);
                }
            }
        }
    }

    /// Applies every message already queued without waiting. Returns how
    /// many were handled; suited to a UI frame tick.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.handle(message);
            handled += 1;
        }
        handled
    }

    /// Waits for and applies the next message.
    pub async fn process_next(&mut self) {
        // the loop holds a sender itself, so the channel never closes
        if let Some(message) = self.rx.recv().await {
            self.handle(message);
        }
    }

    /// Applies messages until every started job has settled.
    pub async fn run_until_idle(&mut self) {
        while !self.outcomes.is_empty() {
            self.process_next().await;
        }
        self.process_pending();
    }

    /// Applies messages until `shutdown` is cancelled.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    log::info!("Task manager shutting down");
                    break;
                }
                () = self.process_next() => {}
            }
        }
    }
}

/// Forwards a job's events to the loop while its worker runs, then reports
/// the worker's result after the last buffered event.
async fn forward_job<F>(
    task_id: TaskId,
    run: F,
    mut receiver: EventReceiver,
    tx: mpsc::UnboundedSender<JobMessage>,
) where
    F: Future<Output = std::result::Result<(), WorkerError>>,
{
    tokio::pin!(run);
    let result = loop {
        tokio::select! {
            biased;
            Some(event) = receiver.recv() => {
                if tx.send(JobMessage::Event(event)).is_err() {
                    return;
                }
            }
            result = &mut run => break result,
        }
    };
    while let Some(event) = receiver.try_recv() {
        if tx.send(JobMessage::Event(event)).is_err() {
            return;
        }
    }
    let _ = tx.send(JobMessage::Finished { task_id, result });
}
