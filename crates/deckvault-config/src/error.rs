//! Error types for configuration operations.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Root folder id failed validation.
    #[error("invalid root folder id")]
    InvalidRootFolder {
        /// Offending value as supplied by the caller.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Underlying persistence operation failed.
    #[error("configuration persistence failed")]
    Persistence {
        /// Source database error.
        #[source]
        source: anyhow::Error,
    },
}
