//! Shared application state for the HTTP handlers.

use std::sync::Arc;

use deckvault_core::{DriveStore, TaskBroker};
use deckvault_drive::WorkerSupervisor;

/// Dependencies wired through every handler.
///
/// Handlers only ever see the trait objects, so the same router serves
/// production adapters and in-memory doubles.
#[derive(Clone)]
pub struct ApiState {
    /// Drive collaborator used for inline organization of uploads.
    pub store: Arc<dyn DriveStore>,
    /// Durable task queue, probed by the health route.
    pub broker: Arc<dyn TaskBroker>,
    /// Owner of the background worker, probed by the health route.
    pub supervisor: Arc<WorkerSupervisor>,
}

impl ApiState {
    /// Bundle the shared dependencies into handler state.
    #[must_use]
    pub fn new(
        store: Arc<dyn DriveStore>,
        broker: Arc<dyn TaskBroker>,
        supervisor: Arc<WorkerSupervisor>,
    ) -> Self {
        Self {
            store,
            broker,
            supervisor,
        }
    }
}
