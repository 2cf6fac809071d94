//! Task and file DTOs shared between the intake, the queue, and the worker.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use uuid::Uuid;

use crate::error::{OrganizeError, OrganizeResult};

/// What a task asks the drive collaborator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Place one uploaded file into the destination folder hierarchy.
    OrganizeFile,
    /// Run a bulk scan rooted at the destination folder.
    ScanFolder,
}

/// Lifecycle of a task. Transitions are monotonic:
/// `Pending -> Running -> {Succeeded, Failed}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed { message: String },
}

impl TaskState {
    /// Whether the task has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }

    /// Whether moving to `next` respects the monotonic lifecycle.
    #[must_use]
    pub const fn allows(&self, next: &Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running),
            Self::Running => matches!(next, Self::Succeeded | Self::Failed { .. }),
            Self::Succeeded | Self::Failed { .. } => false,
        }
    }
}

/// A unit of organization work owned by the queue until claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizeTask {
    pub id: Uuid,
    pub kind: TaskKind,
    /// Original file name; `None` for bootstrap scans.
    pub file_name: Option<String>,
    /// File payload; empty for bootstrap scans.
    pub payload: Vec<u8>,
    pub destination_folder_id: String,
    pub enqueued_at: DateTime<Utc>,
    pub state: TaskState,
}

impl OrganizeTask {
    /// Build a task that places one file under `destination_folder_id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty payload or folder id.
    pub fn organize_file(
        file_name: impl Into<String>,
        payload: Vec<u8>,
        destination_folder_id: &str,
    ) -> OrganizeResult<Self> {
        if payload.is_empty() {
            return Err(OrganizeError::Validation {
                field: "file",
                reason: "empty",
            });
        }
        let destination = normalize_folder_id(destination_folder_id)?;
        Ok(Self {
            id: Uuid::new_v4(),
            kind: TaskKind::OrganizeFile,
            file_name: Some(file_name.into()),
            payload,
            destination_folder_id: destination,
            enqueued_at: Utc::now(),
            state: TaskState::Pending,
        })
    }

    /// Build a bulk-scan task rooted at `root_folder_id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty folder id.
    pub fn scan_folder(root_folder_id: &str) -> OrganizeResult<Self> {
        let destination = normalize_folder_id(root_folder_id)?;
        Ok(Self {
            id: Uuid::new_v4(),
            kind: TaskKind::ScanFolder,
            file_name: None,
            payload: Vec::new(),
            destination_folder_id: destination,
            enqueued_at: Utc::now(),
            state: TaskState::Pending,
        })
    }
}

/// Validate and trim a destination folder identifier.
///
/// # Errors
///
/// Returns a validation error when the id is empty after trimming.
pub fn normalize_folder_id(raw: &str) -> OrganizeResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OrganizeError::Validation {
            field: "destination_folder_id",
            reason: "empty",
        });
    }
    Ok(trimmed.to_string())
}

/// An upload staged on disk for the drive collaborator.
///
/// The backing directory is removed when the value is dropped, so a staged
/// file never outlives the operation that created it.
#[derive(Debug)]
pub struct StagedFile {
    name: String,
    path: PathBuf,
    _dir: TempDir,
}

impl StagedFile {
    /// Write `payload` into a fresh temporary directory under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub async fn stage(name: &str, payload: &[u8]) -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        // Strip any path components a client may have smuggled into the name.
        let file_name = Path::new(name)
            .file_name()
            .map_or_else(|| "upload.bin".to_string(), |n| n.to_string_lossy().into_owned());
        let path = dir.path().join(&file_name);
        tokio::fs::write(&path, payload).await?;
        Ok(Self {
            name: file_name,
            path,
            _dir: dir,
        })
    }

    /// Original (sanitised) file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk location of the staged payload.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
