//! In-memory test doubles for the broker and the drive collaborator.
//!
//! Shipped as a regular module (not behind `cfg(test)`) so downstream crates
//! can exercise the worker, intake, and bootstrap controller without a
//! database or a drive service.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use deckvault_core::{
    DriveStore, OrganizeError, OrganizeResult, OrganizeTask, StagedFile, TaskBroker, TaskKind,
    TaskState,
};
use uuid::Uuid;

/// A call the stub drive observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubCall {
    /// Operation the caller invoked.
    pub kind: TaskKind,
    /// Folder the operation targeted.
    pub destination_folder_id: String,
    /// Staged file name; `None` for scans.
    pub file_name: Option<String>,
}

/// Recording drive double with programmable failures and overlap tracking.
#[derive(Default)]
pub struct StubDriveStore {
    calls: Mutex<Vec<StubCall>>,
    rejections: Mutex<HashMap<String, String>>,
    transient_failures: Mutex<HashSet<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Option<Duration>,
}

impl StubDriveStore {
    /// Make every call linger, so overlapping invocations become observable.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Reject every operation targeting `destination` with `detail`.
    pub fn reject_destination(&self, destination: &str, detail: &str) {
        self.rejections
            .lock()
            .expect("rejections mutex poisoned")
            .insert(destination.to_string(), detail.to_string());
    }

    /// Fail the next operation targeting `destination` as unavailable, then
    /// recover.
    pub fn fail_once_unavailable(&self, destination: &str) {
        self.transient_failures
            .lock()
            .expect("transient mutex poisoned")
            .insert(destination.to_string());
    }

    /// All observed calls, in invocation order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<StubCall> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    /// Peak number of concurrently executing operations.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn invoke(&self, call: StubCall) -> OrganizeResult<()> {
        let destination = call.destination_folder_id.clone();
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(call);

        let was_transient = self
            .transient_failures
            .lock()
            .expect("transient mutex poisoned")
            .remove(&destination);
        if was_transient {
            return Err(OrganizeError::Unavailable {
                source: "simulated drive outage".into(),
            });
        }

        if let Some(detail) = self
            .rejections
            .lock()
            .expect("rejections mutex poisoned")
            .get(&destination)
            .cloned()
        {
            return Err(OrganizeError::Rejected { detail });
        }

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        // Decrement on drop so a call cancelled mid-flight still releases
        // its slot; otherwise overlap tracking would misreport restarts.
        let _guard = ActiveGuard(&self.active);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DriveStore for StubDriveStore {
    async fn organize(
        &self,
        file: &StagedFile,
        destination_folder_id: &str,
    ) -> OrganizeResult<()> {
        self.invoke(StubCall {
            kind: TaskKind::OrganizeFile,
            destination_folder_id: destination_folder_id.to_string(),
            file_name: Some(file.name().to_string()),
        })
        .await
    }

    async fn scan_folder(&self, root_folder_id: &str) -> OrganizeResult<()> {
        self.invoke(StubCall {
            kind: TaskKind::ScanFolder,
            destination_folder_id: root_folder_id.to_string(),
            file_name: None,
        })
        .await
    }
}

#[derive(Default)]
struct MemoryQueue {
    pending: VecDeque<OrganizeTask>,
    states: HashMap<Uuid, TaskState>,
}

/// In-memory FIFO broker mirroring the database queue's contract.
#[derive(Default)]
pub struct MemoryBroker {
    queue: Mutex<MemoryQueue>,
    ping_fails: AtomicBool,
}

impl MemoryBroker {
    /// Make `ping` fail until cleared, for readiness-probe tests.
    pub fn set_ping_failure(&self, failing: bool) {
        self.ping_fails.store(failing, Ordering::SeqCst);
    }

    /// Observed state of a task, if it was ever enqueued.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned.
    #[must_use]
    pub fn state_of(&self, id: Uuid) -> Option<TaskState> {
        self.queue
            .lock()
            .expect("queue mutex poisoned")
            .states
            .get(&id)
            .cloned()
    }

    /// Ids of all tasks ever enqueued, in no particular order.
    #[must_use]
    pub fn known_tasks(&self) -> Vec<Uuid> {
        self.queue
            .lock()
            .expect("queue mutex poisoned")
            .states
            .keys()
            .copied()
            .collect()
    }
}

#[async_trait]
impl TaskBroker for MemoryBroker {
    async fn enqueue(&self, task: &OrganizeTask) -> Result<Uuid> {
        let mut queue = self.queue.lock().expect("queue mutex poisoned");
        queue.states.insert(task.id, TaskState::Pending);
        queue.pending.push_back(task.clone());
        Ok(task.id)
    }

    async fn claim_next(&self) -> Result<Option<OrganizeTask>> {
        let mut queue = self.queue.lock().expect("queue mutex poisoned");
        let Some(mut task) = queue.pending.pop_front() else {
            return Ok(None);
        };
        task.state = TaskState::Running;
        queue.states.insert(task.id, TaskState::Running);
        Ok(Some(task))
    }

    async fn mark_succeeded(&self, id: Uuid) -> Result<()> {
        let mut queue = self.queue.lock().expect("queue mutex poisoned");
        queue.states.insert(id, TaskState::Succeeded);
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<()> {
        let mut queue = self.queue.lock().expect("queue mutex poisoned");
        queue.states.insert(
            id,
            TaskState::Failed {
                message: message.to_string(),
            },
        );
        Ok(())
    }

    async fn reset_stale_running(&self, note: &str) -> Result<u64> {
        let mut queue = self.queue.lock().expect("queue mutex poisoned");
        let mut flipped = 0;
        for state in queue.states.values_mut() {
            if matches!(state, TaskState::Running) {
                *state = TaskState::Failed {
                    message: note.to_string(),
                };
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn ping(&self) -> Result<()> {
        if self.ping_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated broker outage"));
        }
        Ok(())
    }

    async fn pending(&self) -> Result<i64> {
        let queue = self.queue.lock().expect("queue mutex poisoned");
        Ok(i64::try_from(queue.pending.len()).unwrap_or(i64::MAX))
    }
}
