#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Durable task queue backed by `PostgreSQL`.
//!
//! The queue is the hand-off channel between intake/bootstrap and the single
//! organizer worker. Durability comes from the database being a separate
//! process from the worker; FIFO ordering and exclusive claims come from a
//! single `FOR UPDATE SKIP LOCKED` statement that marks the claimed task
//! running.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deckvault_core::{OrganizeTask, TaskBroker, TaskKind, TaskState};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const CREATE_TASKS_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS deckvault_tasks (
        task_id UUID PRIMARY KEY,
        kind TEXT NOT NULL,
        file_name TEXT,
        payload BYTEA NOT NULL,
        destination_folder_id TEXT NOT NULL,
        state TEXT NOT NULL DEFAULT 'pending',
        state_message TEXT,
        enqueued_at TIMESTAMPTZ NOT NULL,
        started_at TIMESTAMPTZ,
        finished_at TIMESTAMPTZ
    )
";

const CREATE_FIFO_INDEX_SQL: &str = r"
    CREATE INDEX IF NOT EXISTS deckvault_tasks_fifo
    ON deckvault_tasks (enqueued_at, task_id)
    WHERE state = 'pending'
";

const INSERT_TASK_SQL: &str = r"
    INSERT INTO deckvault_tasks (
        task_id,
        kind,
        file_name,
        payload,
        destination_folder_id,
        state,
        enqueued_at
    )
    VALUES ($1, $2, $3, $4, $5, 'pending', $6)
";

const CLAIM_NEXT_SQL: &str = r"
    UPDATE deckvault_tasks
    SET state = 'running', started_at = now()
    WHERE task_id = (
        SELECT task_id
        FROM deckvault_tasks
        WHERE state = 'pending'
        ORDER BY enqueued_at, task_id
        FOR UPDATE SKIP LOCKED
        LIMIT 1
    )
    RETURNING
        task_id,
        kind,
        file_name,
        payload,
        destination_folder_id,
        enqueued_at
";

const FINISH_TASK_SQL: &str = r"
    UPDATE deckvault_tasks
    SET state = $2, state_message = $3, finished_at = now()
    WHERE task_id = $1 AND state = 'running'
";

const RESET_STALE_SQL: &str = r"
    UPDATE deckvault_tasks
    SET state = 'failed', state_message = $1, finished_at = now()
    WHERE state = 'running'
";

const PENDING_COUNT_SQL: &str = r"
    SELECT COUNT(*) AS pending
    FROM deckvault_tasks
    WHERE state = 'pending'
";

/// Database-backed FIFO task queue.
#[derive(Clone)]
pub struct TaskQueue {
    pool: PgPool,
}

impl TaskQueue {
    /// Initialise the queue over an existing pool, applying the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub async fn new(pool: PgPool) -> Result<Self> {
        sqlx::query(CREATE_TASKS_SQL)
            .execute(&pool)
            .await
            .context("failed to create task table")?;
        sqlx::query(CREATE_FIFO_INDEX_SQL)
            .execute(&pool)
            .await
            .context("failed to create task fifo index")?;
        Ok(Self { pool })
    }

    /// Connect to the database and initialise the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// schema cannot be applied.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .context("failed to connect to PostgreSQL for the task queue")?;
        Self::new(pool).await
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskBroker for TaskQueue {
    async fn enqueue(&self, task: &OrganizeTask) -> Result<Uuid> {
        sqlx::query(INSERT_TASK_SQL)
            .bind(task.id)
            .bind(serialize_kind(task.kind))
            .bind(task.file_name.as_deref())
            .bind(task.payload.as_slice())
            .bind(task.destination_folder_id.as_str())
            .bind(task.enqueued_at)
            .execute(&self.pool)
            .await
            .context("failed to enqueue task")?;
        Ok(task.id)
    }

    async fn claim_next(&self) -> Result<Option<OrganizeTask>> {
        let row = sqlx::query(CLAIM_NEXT_SQL)
            .fetch_optional(&self.pool)
            .await
            .context("failed to claim next task")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let kind_label: String = row.try_get("kind")?;
        let enqueued_at: DateTime<Utc> = row.try_get("enqueued_at")?;
        Ok(Some(OrganizeTask {
            id: row.try_get("task_id")?,
            kind: deserialize_kind(&kind_label),
            file_name: row.try_get("file_name")?,
            payload: row.try_get("payload")?,
            destination_folder_id: row.try_get("destination_folder_id")?,
            enqueued_at,
            state: TaskState::Running,
        }))
    }

    async fn mark_succeeded(&self, id: Uuid) -> Result<()> {
        let (label, message) = serialize_state(&TaskState::Succeeded);
        sqlx::query(FINISH_TASK_SQL)
            .bind(id)
            .bind(label)
            .bind(message)
            .execute(&self.pool)
            .await
            .context("failed to record task success")?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<()> {
        let state = TaskState::Failed {
            message: message.to_string(),
        };
        let (label, message) = serialize_state(&state);
        sqlx::query(FINISH_TASK_SQL)
            .bind(id)
            .bind(label)
            .bind(message)
            .execute(&self.pool)
            .await
            .context("failed to record task failure")?;
        Ok(())
    }

    async fn reset_stale_running(&self, note: &str) -> Result<u64> {
        let result = sqlx::query(RESET_STALE_SQL)
            .bind(note)
            .execute(&self.pool)
            .await
            .context("failed to reset stale running tasks")?;
        let flipped = result.rows_affected();
        if flipped > 0 {
            tracing::warn!(tasks = flipped, "failed tasks left running by a previous worker");
        }
        Ok(flipped)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("task queue ping failed")?;
        Ok(())
    }

    async fn pending(&self) -> Result<i64> {
        let row = sqlx::query(PENDING_COUNT_SQL)
            .fetch_one(&self.pool)
            .await
            .context("failed to count pending tasks")?;
        Ok(row.try_get("pending")?)
    }
}

const fn serialize_kind(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::OrganizeFile => "organize_file",
        TaskKind::ScanFolder => "scan_folder",
    }
}

fn deserialize_kind(label: &str) -> TaskKind {
    match label {
        "scan_folder" => TaskKind::ScanFolder,
        "organize_file" => TaskKind::OrganizeFile,
        other => {
            tracing::warn!(kind = %other, "unknown task kind encountered in queue");
            TaskKind::OrganizeFile
        }
    }
}

fn serialize_state(state: &TaskState) -> (&'static str, Option<String>) {
    match state {
        TaskState::Pending => ("pending", None),
        TaskState::Running => ("running", None),
        TaskState::Succeeded => ("succeeded", None),
        TaskState::Failed { message } => ("failed", Some(message.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_round_trip() {
        for kind in [TaskKind::OrganizeFile, TaskKind::ScanFolder] {
            assert_eq!(deserialize_kind(serialize_kind(kind)), kind);
        }
        assert_eq!(deserialize_kind("bogus"), TaskKind::OrganizeFile);
    }

    #[test]
    fn state_serialisation_carries_failure_detail() {
        assert_eq!(serialize_state(&TaskState::Pending), ("pending", None));
        assert_eq!(serialize_state(&TaskState::Succeeded), ("succeeded", None));
        let (label, message) = serialize_state(&TaskState::Failed {
            message: "quota exceeded".into(),
        });
        assert_eq!(label, "failed");
        assert_eq!(message.as_deref(), Some("quota exceeded"));
    }
}
