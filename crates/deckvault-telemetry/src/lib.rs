//! Telemetry primitives: logging setup and the per-run worker log file.

/// Logging initialisation and configuration.
pub mod init;
/// Per-run worker log file handle.
pub mod worker_log;

pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
pub use worker_log::WorkerLog;
