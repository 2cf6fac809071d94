//! Application wiring and the serve loop.
//!
//! Production dependency construction lives here; the bootstrap sequence
//! itself is in `controller.rs` and only ever sees trait objects, so it can
//! be exercised without a database or a drive service.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use deckvault_api::{ApiServer, ApiState};
use deckvault_config::{ConfigError, ConfigService, validate_root_folder_id};
use deckvault_core::{ConfigStore, DriveStore, TaskBroker};
use deckvault_data::TaskQueue;
use deckvault_drive::{RestDriveStore, WorkerConfig, WorkerSupervisor};
use deckvault_events::{EventBus, EventStream};
use deckvault_telemetry::{LogFormat, LoggingConfig, WorkerLog, init_logging};
use tracing::info;

use crate::cli::{Cli, Command};
use crate::controller::{BootstrapDeps, run_bootstrap};
use crate::error::{AppError, AppResult};

/// Entry point for the deckvault binary.
///
/// # Errors
///
/// Returns an error if dependency construction, the bootstrap sequence, or
/// the serve loop fails.
pub async fn run_app() -> AppResult<()> {
    let cli = Cli::parse();

    let worker_log = cli
        .log_file
        .clone()
        .map_or_else(WorkerLog::default_location, WorkerLog::at);

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: LogFormat::infer(),
    };
    match cli.command {
        // The worker log is a bootstrap artifact; plain serve leaves it
        // untouched and logs to stdout only.
        Command::Serve => {
            init_logging(&logging, None)
                .map_err(|source| AppError::telemetry("telemetry.init", source))?;
        }
        Command::Bootstrap {
            ref root_folder_id, ..
        } => {
            prepare_bootstrap_log(&worker_log, root_folder_id)?;
            init_logging(&logging, Some(worker_log.path()))
                .map_err(|source| AppError::telemetry("telemetry.init", source))?;
        }
    }

    info!("deckvault starting");

    let queue = TaskQueue::connect(&cli.database_url)
        .await
        .map_err(|source| AppError::broker("queue.connect", source))?;
    let config = ConfigService::new(queue.pool().clone())
        .await
        .map_err(|source| {
            AppError::config("config_service.new", ConfigError::Persistence { source })
        })?;

    let store: Arc<dyn DriveStore> = Arc::new(
        RestDriveStore::new(&cli.drive_url)
            .map_err(|source| AppError::api("drive_store.new", source))?,
    );
    let broker: Arc<dyn TaskBroker> = Arc::new(queue);
    let config_store: Arc<dyn ConfigStore> = Arc::new(config);

    let events = EventBus::new();
    let supervisor = Arc::new(WorkerSupervisor::new(
        Arc::clone(&broker),
        Arc::clone(&store),
        events.clone(),
        WorkerConfig::default(),
    ));
    spawn_event_logger(events.subscribe());

    match cli.command {
        Command::Serve => {
            supervisor.start().await;
        }
        Command::Bootstrap {
            ref root_folder_id,
            settle_secs,
        } => {
            let deps = BootstrapDeps {
                broker: Arc::clone(&broker),
                config: config_store,
                supervisor: Arc::clone(&supervisor),
                events: events.clone(),
                worker_log,
            };
            let report =
                run_bootstrap(&deps, root_folder_id, Duration::from_secs(settle_secs)).await?;
            info!(
                root_folder_id = %report.root_folder_id,
                worker = report.worker_status.as_str(),
                worker_log = %report.worker_log.display(),
                replaced_worker = report.replaced_worker,
                reset_tasks = report.reset_tasks,
                queue_settled = report.queue_settled,
                initial_task_id = ?report.initial_task_id,
                "bootstrap complete, serving intake"
            );
        }
    }

    let state = ApiState::new(store, broker, supervisor);
    ApiServer::new(state)
        .serve(cli.listen)
        .await
        .map_err(|source| AppError::api("api.serve", source))
}

/// Truncate the worker log for a new bootstrap run.
///
/// The root folder id is checked first: a bad id must fail before any side
/// effect, including wiping the previous run's log.
fn prepare_bootstrap_log(worker_log: &WorkerLog, raw_root_folder_id: &str) -> AppResult<()> {
    validate_root_folder_id(raw_root_folder_id)
        .map_err(|source| AppError::InvalidRootFolder { source })?;
    worker_log
        .truncate()
        .map_err(|source| AppError::telemetry("worker_log.create", source))
}

/// Drain the event bus into the log so every pipeline event leaves a trace.
fn spawn_event_logger(mut events: EventStream) {
    tokio::spawn(async move {
        while let Some(envelope) = events.next().await {
            info!(
                event = envelope.event.kind(),
                event_id = envelope.id,
                detail = ?envelope.event,
                "pipeline event"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn bad_root_id_leaves_the_previous_log_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let worker_log = WorkerLog::at(dir.path().join("worker.log"));
        fs::write(worker_log.path(), "lines from the previous run\n").expect("seed log");

        let err = prepare_bootstrap_log(&worker_log, "   ").expect_err("must fail validation");
        assert!(matches!(err, AppError::InvalidRootFolder { .. }));
        assert_eq!(
            fs::read_to_string(worker_log.path()).expect("log"),
            "lines from the previous run\n"
        );
    }

    #[test]
    fn valid_root_id_truncates_the_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let worker_log = WorkerLog::at(dir.path().join("worker.log"));
        fs::write(worker_log.path(), "stale\n").expect("seed log");

        prepare_bootstrap_log(&worker_log, "F999").expect("prepare");
        assert_eq!(fs::read_to_string(worker_log.path()).expect("log"), "");
    }
}
