//! HTTP intake surface for the deckvault pipeline.
//!
//! Two request routes: `POST /upload` accepts a multipart presentation and
//! organizes it inline, `GET /health` reports worker and queue readiness.
//! Everything stateful lives behind the trait objects in [`ApiState`].

pub mod error;
mod health;
mod router;
mod state;
mod upload;

pub use error::ApiError;
pub use router::ApiServer;
pub use state::ApiState;
pub use upload::{UPLOAD_REJECTED_MESSAGE, UPLOAD_SUCCESS_MESSAGE};
