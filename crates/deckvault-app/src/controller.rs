//! The bootstrap controller sequence.
//!
//! One linear pass that points the pipeline at a new root folder: validate
//! the id, tear down the old worker, wipe the per-run log, fail any task the
//! old worker left mid-flight, persist the new root, start a fresh worker,
//! wait for the queue to answer, and fire the initial scan. Validation is the
//! only fatal gate after side effects begin; a queue that never settles or a
//! scan that cannot be enqueued degrades the report instead of aborting,
//! because by then a healthy worker is already running.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use deckvault_config::{ConfigError, validate_root_folder_id};
use deckvault_core::{ConfigStore, OrganizeTask, TaskBroker};
use deckvault_drive::{WorkerStatus, WorkerSupervisor};
use deckvault_events::{Event, EventBus};
use deckvault_telemetry::WorkerLog;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Note stamped onto tasks the previous worker left in flight.
const STALE_TASK_NOTE: &str = "worker restarted while task was running";

const PING_INTERVAL: Duration = Duration::from_millis(250);

/// Collaborators the controller drives.
pub struct BootstrapDeps {
    /// Durable task queue.
    pub broker: Arc<dyn TaskBroker>,
    /// Persistent root folder configuration.
    pub config: Arc<dyn ConfigStore>,
    /// Owner of the one organizer worker.
    pub supervisor: Arc<WorkerSupervisor>,
    /// Bus the controller publishes lifecycle events to.
    pub events: EventBus,
    /// Per-run worker log, truncated before the new worker starts.
    pub worker_log: WorkerLog,
}

/// Outcome of one bootstrap run.
#[derive(Debug)]
pub struct BootstrapReport {
    /// Root folder id the pipeline now organizes under.
    pub root_folder_id: String,
    /// Location of the freshly truncated worker log.
    pub worker_log: PathBuf,
    /// Worker status at the end of the sequence.
    pub worker_status: WorkerStatus,
    /// Whether a previous worker had to be torn down.
    pub replaced_worker: bool,
    /// Tasks the old worker left running, now marked failed.
    pub reset_tasks: u64,
    /// Whether the queue answered within the settle window.
    pub queue_settled: bool,
    /// Id of the initial scan task, when it could be enqueued.
    pub initial_task_id: Option<Uuid>,
}

/// Run the bootstrap sequence against `raw_root_folder_id`.
///
/// # Errors
///
/// Returns an error if the id fails validation (before any side effect), or
/// if the log, queue, or configuration cannot be prepared for the new run.
pub async fn run_bootstrap(
    deps: &BootstrapDeps,
    raw_root_folder_id: &str,
    settle: Duration,
) -> AppResult<BootstrapReport> {
    let root_folder_id = validate_root_folder_id(raw_root_folder_id)
        .map_err(|source| AppError::InvalidRootFolder { source })?;
    info!(root_folder_id = %root_folder_id, "bootstrap sequence starting");

    let replaced_worker = deps.supervisor.stop().await;

    deps.worker_log
        .truncate()
        .map_err(|source| AppError::telemetry("worker_log.truncate", source))?;

    let reset_tasks = deps
        .broker
        .reset_stale_running(STALE_TASK_NOTE)
        .await
        .map_err(|source| AppError::broker("queue.reset_stale_running", source))?;
    if reset_tasks > 0 {
        warn!(reset_tasks, "failed tasks the previous worker left in flight");
    }

    deps.config
        .set_root_folder(&root_folder_id)
        .await
        .map_err(|source| {
            AppError::config("config.set_root_folder", ConfigError::Persistence { source })
        })?;

    deps.supervisor.start().await;

    let queue_settled = wait_for_queue(deps.broker.as_ref(), settle).await;
    if !queue_settled {
        warn!(
            settle_ms = u64::try_from(settle.as_millis()).unwrap_or(u64::MAX),
            "queue did not answer within the settle window, firing the scan anyway"
        );
    }

    let initial_task_id = fire_initial_scan(deps, &root_folder_id).await;
    let worker_status = deps.supervisor.status().await;

    info!(
        root_folder_id = %root_folder_id,
        worker = worker_status.as_str(),
        queue_settled,
        initial_task_id = ?initial_task_id,
        "bootstrap sequence finished"
    );

    Ok(BootstrapReport {
        root_folder_id,
        worker_log: deps.worker_log.path().to_path_buf(),
        worker_status,
        replaced_worker,
        reset_tasks,
        queue_settled,
        initial_task_id,
    })
}

/// Poll the queue until it answers or the settle window closes.
async fn wait_for_queue(broker: &dyn TaskBroker, settle: Duration) -> bool {
    let deadline = Instant::now() + settle;
    loop {
        match broker.ping().await {
            Ok(()) => return true,
            Err(err) => {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                debug!(error = %err, "queue not ready yet");
                tokio::time::sleep(PING_INTERVAL.min(deadline - now)).await;
            }
        }
    }
}

/// Enqueue the initial scan. Failures are reported, not fatal: the worker is
/// already healthy and an operator can fire the scan manually.
async fn fire_initial_scan(deps: &BootstrapDeps, root_folder_id: &str) -> Option<Uuid> {
    let task = match OrganizeTask::scan_folder(root_folder_id) {
        Ok(task) => task,
        Err(err) => {
            warn!(root_folder_id = %root_folder_id, error = %err, "could not build the initial scan task");
            return None;
        }
    };
    match deps.broker.enqueue(&task).await {
        Ok(task_id) => {
            deps.events.publish(Event::TaskEnqueued {
                task_id,
                destination_folder_id: root_folder_id.to_string(),
            });
            info!(task_id = %task_id, root_folder_id = %root_folder_id, "initial scan enqueued");
            Some(task_id)
        }
        Err(err) => {
            warn!(root_folder_id = %root_folder_id, error = %err, "failed to enqueue the initial scan");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deckvault_core::{TaskKind, TaskState};
    use deckvault_drive::testing::{MemoryBroker, StubDriveStore};
    use deckvault_drive::WorkerConfig;
    use std::fs;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryConfigStore {
        root: Mutex<Option<String>>,
    }

    #[async_trait]
    impl ConfigStore for MemoryConfigStore {
        async fn set_root_folder(&self, folder_id: &str) -> anyhow::Result<()> {
            *self.root.lock().expect("root mutex poisoned") = Some(folder_id.to_string());
            Ok(())
        }

        async fn root_folder(&self) -> anyhow::Result<Option<String>> {
            Ok(self.root.lock().expect("root mutex poisoned").clone())
        }
    }

    struct Harness {
        deps: BootstrapDeps,
        broker: Arc<MemoryBroker>,
        config: Arc<MemoryConfigStore>,
        store: Arc<StubDriveStore>,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let broker = Arc::new(MemoryBroker::default());
        let config = Arc::new(MemoryConfigStore::default());
        let store = Arc::new(StubDriveStore::default());
        let events = EventBus::new();
        let supervisor = Arc::new(WorkerSupervisor::new(
            broker.clone(),
            store.clone(),
            events.clone(),
            WorkerConfig {
                poll_interval: Duration::from_millis(10),
                ..WorkerConfig::default()
            },
        ));
        let worker_log = WorkerLog::at(dir.path().join("worker.log"));
        Harness {
            deps: BootstrapDeps {
                broker: broker.clone(),
                config: config.clone(),
                supervisor,
                events,
                worker_log,
            },
            broker,
            config,
            store,
            _dir: dir,
        }
    }

    const SETTLE: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn happy_path_persists_config_starts_worker_and_fires_the_scan() {
        let harness = harness();
        fs::write(harness.deps.worker_log.path(), "lines from the previous run\n")
            .expect("seed log");

        let report = run_bootstrap(&harness.deps, " F999 ", SETTLE)
            .await
            .expect("bootstrap");

        assert_eq!(report.root_folder_id, "F999");
        assert_eq!(report.worker_status, WorkerStatus::Running);
        assert!(report.queue_settled);
        assert!(!report.replaced_worker);
        assert_eq!(report.reset_tasks, 0);

        let task_id = report.initial_task_id.expect("scan enqueued");
        assert!(harness.broker.state_of(task_id).is_some());
        assert_eq!(
            harness.config.root_folder().await.expect("config").as_deref(),
            Some("F999")
        );
        assert_eq!(
            fs::read_to_string(harness.deps.worker_log.path()).expect("log"),
            ""
        );

        harness.deps.supervisor.stop().await;
    }

    #[tokio::test]
    async fn invalid_id_fails_before_any_side_effect() {
        let harness = harness();
        fs::write(harness.deps.worker_log.path(), "must survive\n").expect("seed log");

        let err = run_bootstrap(&harness.deps, "F1 23", SETTLE)
            .await
            .expect_err("must fail validation");
        assert!(matches!(err, AppError::InvalidRootFolder { .. }));

        assert_eq!(
            fs::read_to_string(harness.deps.worker_log.path()).expect("log"),
            "must survive\n"
        );
        assert!(harness.config.root_folder().await.expect("config").is_none());
        assert!(harness.broker.known_tasks().is_empty());
        assert_eq!(
            harness.deps.supervisor.status().await,
            WorkerStatus::Stopped
        );
    }

    #[tokio::test]
    async fn rerunning_replaces_the_worker_and_the_root() {
        let harness = harness();

        let first = run_bootstrap(&harness.deps, "F1", SETTLE)
            .await
            .expect("first run");
        let second = run_bootstrap(&harness.deps, "F2", SETTLE)
            .await
            .expect("second run");

        assert!(!first.replaced_worker);
        assert!(second.replaced_worker);
        assert_eq!(second.worker_status, WorkerStatus::Running);
        assert_eq!(
            harness.config.root_folder().await.expect("config").as_deref(),
            Some("F2")
        );

        harness.deps.supervisor.stop().await;
        assert_eq!(harness.store.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn stale_running_tasks_are_failed_with_the_restart_note() {
        let harness = harness();

        let stranded = OrganizeTask::scan_folder("F0").expect("task");
        harness.broker.enqueue(&stranded).await.expect("enqueue");
        harness
            .broker
            .claim_next()
            .await
            .expect("claim")
            .expect("one task");

        let report = run_bootstrap(&harness.deps, "F999", SETTLE)
            .await
            .expect("bootstrap");

        assert_eq!(report.reset_tasks, 1);
        assert!(matches!(
            harness.broker.state_of(stranded.id),
            Some(TaskState::Failed { ref message }) if message == STALE_TASK_NOTE
        ));

        harness.deps.supervisor.stop().await;
    }

    #[tokio::test]
    async fn unsettled_queue_degrades_the_report_but_still_fires_the_scan() {
        let harness = harness();
        harness.broker.set_ping_failure(true);

        let report = run_bootstrap(&harness.deps, "F999", Duration::from_millis(50))
            .await
            .expect("bootstrap");

        assert!(!report.queue_settled);
        let task_id = report.initial_task_id.expect("scan still enqueued");
        assert!(harness.broker.known_tasks().contains(&task_id));

        harness.deps.supervisor.stop().await;
    }

    #[tokio::test]
    async fn enqueued_scan_targets_the_new_root() {
        let harness = harness();
        let mut events = harness.deps.events.subscribe();

        let report = run_bootstrap(&harness.deps, "F42", SETTLE)
            .await
            .expect("bootstrap");
        harness.deps.supervisor.stop().await;

        let task_id = report.initial_task_id.expect("scan enqueued");
        let enqueued = loop {
            let envelope = events.next().await.expect("event");
            if let Event::TaskEnqueued {
                task_id: id,
                destination_folder_id,
            } = envelope.event
            {
                break (id, destination_folder_id);
            }
        };
        assert_eq!(enqueued.0, task_id);
        assert_eq!(enqueued.1, "F42");

        let scans: Vec<TaskKind> = harness
            .store
            .calls()
            .into_iter()
            .map(|call| call.kind)
            .collect();
        // The worker may or may not have claimed the scan before stop; when
        // it has, the call must be the scan of the new root.
        if let Some(kind) = scans.first() {
            assert_eq!(*kind, TaskKind::ScanFolder);
        }
    }
}
