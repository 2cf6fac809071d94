#![deny(unsafe_code)]
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

//! Drive collaborator adapters and the single-concurrency organizer worker.
//!
//! Layout: `store.rs` (REST adapter for the external drive service),
//! `worker.rs` (the task-processing loop), `supervisor.rs` (start/stop/status
//! ownership of the one worker task), `testing.rs` (in-memory doubles).

/// REST adapter for the external drive service.
pub mod store;
/// Ownership and lifecycle of the single worker task.
pub mod supervisor;
/// In-memory test doubles for the broker and the drive collaborator.
pub mod testing;
/// The organizer worker loop.
pub mod worker;

pub use store::RestDriveStore;
pub use supervisor::{WorkerStatus, WorkerSupervisor};
pub use worker::{RetryPolicy, WorkerConfig};
