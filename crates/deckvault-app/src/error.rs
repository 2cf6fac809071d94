//! # Design
//!
//! - Centralize application-level errors for wiring and the bootstrap
//!   sequence.
//! - Keep error messages constant while carrying context fields for
//!   debugging.
//! - Preserve source errors without re-logging at call sites.

use deckvault_config::ConfigError;
use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// The bootstrap root folder id was rejected before any side effects.
    #[error("root folder id is invalid")]
    InvalidRootFolder {
        /// Source validation error.
        source: ConfigError,
    },
    /// Configuration persistence failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ConfigError,
    },
    /// Queue or database operations failed.
    #[error("queue operation failed")]
    Broker {
        /// Operation identifier.
        operation: &'static str,
        /// Source broker error.
        source: anyhow::Error,
    },
    /// Logging or worker-log operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: anyhow::Error,
    },
    /// The intake API failed to bind or serve.
    #[error("api server operation failed")]
    Api {
        /// Operation identifier.
        operation: &'static str,
        /// Source API error.
        source: anyhow::Error,
    },
}

impl AppError {
    /// Wrap a configuration failure with its operation tag.
    #[must_use]
    pub const fn config(operation: &'static str, source: ConfigError) -> Self {
        Self::Config { operation, source }
    }

    /// Wrap a broker failure with its operation tag.
    #[must_use]
    pub const fn broker(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Broker { operation, source }
    }

    /// Wrap a telemetry failure with its operation tag.
    #[must_use]
    pub const fn telemetry(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Telemetry { operation, source }
    }

    /// Wrap an API failure with its operation tag.
    #[must_use]
    pub const fn api(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Api { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_are_constant_and_sources_preserved() {
        let err = AppError::broker("queue.enqueue", anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "queue operation failed");
        assert!(err.source().is_some());

        let invalid = AppError::InvalidRootFolder {
            source: ConfigError::InvalidRootFolder {
                value: String::new(),
                reason: "empty",
            },
        };
        assert_eq!(invalid.to_string(), "root folder id is invalid");
    }
}
