//! Error types for organize operations.

use std::error::Error;

use thiserror::Error;

/// Primary error type for organize operations.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Input failed validation before any work was attempted.
    #[error("invalid organize input")]
    Validation {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The drive collaborator rejected the operation.
    #[error("drive rejected the organize operation")]
    Rejected {
        /// Collaborator-supplied failure detail.
        detail: String,
    },
    /// The drive collaborator could not be reached.
    #[error("drive service unavailable")]
    Unavailable {
        /// Underlying transport or IO failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl OrganizeError {
    /// Human-readable detail suitable for surfacing to an intake caller.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Validation { field, reason } => format!("invalid {field}: {reason}"),
            Self::Rejected { detail } => detail.clone(),
            Self::Unavailable { source } => source.to_string(),
        }
    }
}

/// Convenience alias for organize operation results.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
