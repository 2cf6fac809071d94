//! Readiness probe over the worker and the queue.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::warn;

use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct HealthSnapshot {
    status: &'static str,
    worker: &'static str,
    queue_reachable: bool,
    pending_tasks: Option<i64>,
}

/// `GET /health`: degraded responses keep a body so operators see which half
/// of the pipeline is down.
pub(crate) async fn health(
    State(state): State<ApiState>,
) -> (StatusCode, Json<HealthSnapshot>) {
    let worker = state.supervisor.status().await;

    let (queue_reachable, pending_tasks) = match state.broker.ping().await {
        Ok(()) => match state.broker.pending().await {
            Ok(depth) => (true, Some(depth)),
            Err(err) => {
                warn!(error = %err, "queue depth probe failed");
                (true, None)
            }
        },
        Err(err) => {
            warn!(error = %err, "queue ping failed");
            (false, None)
        }
    };

    let status = if queue_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let snapshot = HealthSnapshot {
        status: if queue_reachable { "ok" } else { "degraded" },
        worker: worker.as_str(),
        queue_reachable,
        pending_tasks,
    };
    (status, Json(snapshot))
}
