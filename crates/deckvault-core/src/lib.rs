//! Engine-agnostic task model and trait seams for the deckvault pipeline.

/// Domain error types for organize operations.
pub mod error;
/// Task and file DTOs.
pub mod model;
/// Collaborator, broker, and configuration traits implemented by adapters.
pub mod service;

pub use error::{OrganizeError, OrganizeResult};
pub use model::{OrganizeTask, StagedFile, TaskKind, TaskState, normalize_folder_id};
pub use service::{ConfigStore, DriveStore, TaskBroker};
