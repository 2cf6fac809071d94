//! The organizer worker loop.
//!
//! Exactly one worker task consumes the queue. Serial execution is the
//! backpressure policy: the drive service rate-limits aggressively and its
//! folder-create-then-move sequences must not race, so one in-flight task is
//! a correctness requirement, not a simplification.

use std::sync::Arc;
use std::time::Duration;

use deckvault_core::{
    DriveStore, OrganizeError, OrganizeResult, OrganizeTask, StagedFile, TaskBroker, TaskKind,
};
use deckvault_events::{Event, EventBus};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Retry behaviour for failed organize attempts.
///
/// Only `Unavailable` outcomes are retried; a rejection is deterministic and
/// an operator re-submits it manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Fail the task on the first error (the default).
    None,
    /// Retry up to `attempts` total attempts, sleeping `backoff` in between.
    Bounded {
        /// Total attempts, including the first.
        attempts: u32,
        /// Fixed pause between attempts.
        backoff: Duration,
    },
}

impl RetryPolicy {
    const fn attempts(self) -> u32 {
        match self {
            Self::None => 1,
            Self::Bounded { attempts, .. } => attempts,
        }
    }

    const fn backoff(self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Bounded { backoff, .. } => backoff,
        }
    }
}

/// Tunables for the worker loop.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// How long to sleep when the queue is empty or the broker errors.
    pub poll_interval: Duration,
    /// Retry behaviour for failed attempts.
    pub retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            retry: RetryPolicy::None,
        }
    }
}

/// Spawn the worker loop as a detached tokio task.
pub(crate) fn spawn(
    broker: Arc<dyn TaskBroker>,
    store: Arc<dyn DriveStore>,
    events: EventBus,
    config: WorkerConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let worker = Worker {
            broker,
            store,
            events,
            config,
        };
        worker.run().await;
    })
}

struct Worker {
    broker: Arc<dyn TaskBroker>,
    store: Arc<dyn DriveStore>,
    events: EventBus,
    config: WorkerConfig,
}

impl Worker {
    async fn run(&self) {
        info!("organizer worker loop started");
        loop {
            match self.broker.claim_next().await {
                Ok(Some(task)) => self.process(task).await,
                Ok(None) => tokio::time::sleep(self.config.poll_interval).await,
                Err(err) => {
                    // Broker hiccups must not kill the loop; back off and retry.
                    warn!(error = %err, "failed to claim a task from the queue");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn process(&self, task: OrganizeTask) {
        let task_id = task.id;
        self.events.publish(Event::TaskStarted { task_id });
        info!(
            task_id = %task_id,
            kind = ?task.kind,
            destination = %task.destination_folder_id,
            "task execution started"
        );

        match self.execute_with_retry(&task).await {
            Ok(()) => {
                if let Err(err) = self.broker.mark_succeeded(task_id).await {
                    warn!(task_id = %task_id, error = %err, "failed to record task success");
                }
                self.events.publish(Event::TaskSucceeded { task_id });
                info!(task_id = %task_id, "task succeeded");
            }
            Err(err) => {
                let detail = err.detail();
                if let Err(mark_err) = self.broker.mark_failed(task_id, &detail).await {
                    warn!(task_id = %task_id, error = %mark_err, "failed to record task failure");
                }
                self.events.publish(Event::TaskFailed {
                    task_id,
                    message: detail.clone(),
                });
                warn!(
                    task_id = %task_id,
                    destination = %task.destination_folder_id,
                    error = %err,
                    detail = %detail,
                    "task failed; no automatic retry, resubmit manually"
                );
            }
        }
    }

    async fn execute_with_retry(&self, task: &OrganizeTask) -> OrganizeResult<()> {
        let attempts = self.config.retry.attempts().max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.execute(task).await {
                Ok(()) => return Ok(()),
                Err(err @ OrganizeError::Unavailable { .. }) if attempt < attempts => {
                    debug!(
                        task_id = %task.id,
                        attempt,
                        error = %err,
                        "drive unavailable, retrying after backoff"
                    );
                    tokio::time::sleep(self.config.retry.backoff()).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn execute(&self, task: &OrganizeTask) -> OrganizeResult<()> {
        match task.kind {
            TaskKind::ScanFolder => self.store.scan_folder(&task.destination_folder_id).await,
            TaskKind::OrganizeFile => {
                let name = task.file_name.as_deref().unwrap_or("upload.bin");
                let staged = StagedFile::stage(name, &task.payload).await.map_err(|err| {
                    OrganizeError::Unavailable { source: err.into() }
                })?;
                self.store
                    .organize(&staged, &task.destination_folder_id)
                    .await
            }
        }
    }
}
