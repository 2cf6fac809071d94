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
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Database-backed configuration store for the root destination folder.
//!
//! Layout: `service.rs` (the `ConfigService` persistence facade),
//! `error.rs` (`ConfigError`), `validate.rs` (folder-id validation).

/// Error types for configuration operations.
pub mod error;
/// Persistence facade for the root folder record.
pub mod service;
/// Validation helpers for configuration values.
pub mod validate;

pub use error::ConfigError;
pub use service::{ConfigService, RootFolderConfig};
pub use validate::validate_root_folder_id;
