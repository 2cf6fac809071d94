//! Collaborator, broker, and configuration traits implemented by adapters.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::OrganizeResult;
use crate::model::{OrganizeTask, StagedFile};

/// External drive capability the pipeline organizes files through.
///
/// The concrete protocol is an adapter concern; the pipeline only needs the
/// two operations below.
#[async_trait]
pub trait DriveStore: Send + Sync {
    /// Place a staged file into the folder hierarchy under
    /// `destination_folder_id`. All-or-nothing per file.
    async fn organize(&self, file: &StagedFile, destination_folder_id: &str)
    -> OrganizeResult<()>;

    /// Run a bulk scan rooted at `root_folder_id`.
    async fn scan_folder(&self, root_folder_id: &str) -> OrganizeResult<()>;
}

/// Durable FIFO hand-off channel between intake/bootstrap and the worker.
///
/// A task belongs to the broker until claimed; claiming transfers ownership
/// to the single worker and marks the task running in the same step, so two
/// consumers can never observe the same pending task.
#[async_trait]
pub trait TaskBroker: Send + Sync {
    /// Append a pending task; returns its id. FIFO by enqueue time, no
    /// priority, no dedup.
    async fn enqueue(&self, task: &OrganizeTask) -> anyhow::Result<Uuid>;

    /// Claim the oldest pending task, marking it running. `None` when the
    /// queue is empty; callers turn this into a blocking dequeue by polling.
    async fn claim_next(&self) -> anyhow::Result<Option<OrganizeTask>>;

    /// Record a terminal success for a running task.
    async fn mark_succeeded(&self, id: Uuid) -> anyhow::Result<()>;

    /// Record a terminal failure with the collaborator's detail.
    async fn mark_failed(&self, id: Uuid, message: &str) -> anyhow::Result<()>;

    /// Fail any task left running by a dead worker. Returns how many tasks
    /// were flipped; used by the bootstrap controller.
    async fn reset_stale_running(&self, note: &str) -> anyhow::Result<u64>;

    /// Cheap connectivity probe used for readiness checks.
    async fn ping(&self) -> anyhow::Result<()>;

    /// Number of pending tasks, for health reporting.
    async fn pending(&self) -> anyhow::Result<i64>;
}

/// Single-writer store for the root destination folder id.
///
/// Written only by the bootstrap controller; read by the scan task it
/// enqueues and by diagnostics.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Persist the new root folder id, replacing any previous value.
    async fn set_root_folder(&self, folder_id: &str) -> anyhow::Result<()>;

    /// Currently configured root folder id, if any bootstrap has run.
    async fn root_folder(&self) -> anyhow::Result<Option<String>>;
}
