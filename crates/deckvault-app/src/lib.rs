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

//! Deckvault application wiring.
//!
//! Layout: `cli.rs` (argument parsing), `bootstrap.rs` (service wiring and
//! the serve loop), `controller.rs` (the bootstrap sequence that restarts
//! the worker and fires the initial scan).

/// Application wiring and the serve loop.
pub mod bootstrap;
/// Command-line interface definitions.
pub mod cli;
/// The bootstrap controller sequence.
pub mod controller;
/// Application-level error types.
pub mod error;

pub use bootstrap::run_app;
pub use controller::{BootstrapDeps, BootstrapReport, run_bootstrap};
pub use error::{AppError, AppResult};
