//! Ownership and lifecycle of the single worker task.
//!
//! The supervisor is the only component allowed to spawn the worker loop.
//! `start` always tears down any previous worker before spawning a fresh one,
//! which is what keeps the queue single-consumer across restarts.

use std::sync::Arc;

use deckvault_core::{DriveStore, TaskBroker};
use deckvault_events::{Event, EventBus};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::worker::{self, WorkerConfig};

/// Observable state of the supervised worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// The worker task is alive and polling the queue.
    Running,
    /// No worker task exists, or the last one has finished.
    Stopped,
}

impl WorkerStatus {
    /// Stable label for logs and status payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

/// Owns the one worker task and restarts it on demand.
pub struct WorkerSupervisor {
    broker: Arc<dyn TaskBroker>,
    store: Arc<dyn DriveStore>,
    events: EventBus,
    config: WorkerConfig,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerSupervisor {
    /// Build a supervisor; no worker runs until `start` is called.
    #[must_use]
    pub fn new(
        broker: Arc<dyn TaskBroker>,
        store: Arc<dyn DriveStore>,
        events: EventBus,
        config: WorkerConfig,
    ) -> Self {
        Self {
            broker,
            store,
            events,
            config,
            handle: Mutex::new(None),
        }
    }

    /// Start the worker, replacing any previous instance.
    ///
    /// The old worker is aborted and awaited before the new one spawns, so
    /// at no point do two loops consume the queue.
    pub async fn start(&self) {
        let mut slot = self.handle.lock().await;
        if let Some(previous) = slot.take() {
            previous.abort();
            // Abort only requests cancellation; wait for the task to finish
            // so the old loop cannot still hold a claimed task.
            let _ = previous.await;
            debug!("replaced a previous worker instance");
        }
        let handle = worker::spawn(
            Arc::clone(&self.broker),
            Arc::clone(&self.store),
            self.events.clone(),
            self.config,
        );
        *slot = Some(handle);
        self.events.publish(Event::WorkerStarted);
        info!("organizer worker started");
    }

    /// Stop the worker if one is running. Returns whether a worker was
    /// actually torn down; calling this with no worker is a no-op.
    pub async fn stop(&self) -> bool {
        let mut slot = self.handle.lock().await;
        let Some(handle) = slot.take() else {
            debug!("no worker to stop");
            return false;
        };
        handle.abort();
        // Wait for the abort to land so a follow-up start cannot overlap.
        let _ = handle.await;
        self.events.publish(Event::WorkerStopped);
        info!("organizer worker stopped");
        true
    }

    /// Current status of the supervised worker.
    pub async fn status(&self) -> WorkerStatus {
        let slot = self.handle.lock().await;
        match slot.as_ref() {
            Some(handle) if !handle.is_finished() => WorkerStatus::Running,
            _ => WorkerStatus::Stopped,
        }
    }
}
