//! Router assembly and the serve loop.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::response::Response;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

use crate::health::health;
use crate::state::ApiState;
use crate::upload::upload;

/// Presentations top out well under this; anything larger is a client bug.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// The assembled HTTP intake server.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire the routes over the shared state.
    #[must_use]
    pub fn new(state: ApiState) -> Self {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_response(|response: &Response, latency: Duration, span: &Span| {
                span.record("status_code", response.status().as_u16());
                let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                span.record("latency_ms", latency_ms);
            });

        let router = Router::new()
            .route("/upload", post(upload))
            .route("/health", get(health))
            .layer(
                ServiceBuilder::new()
                    .layer(trace_layer)
                    .layer(CorsLayer::permissive()),
            )
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .with_state(state);

        Self { router }
    }

    /// Router handle, used directly by in-process tests.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind `addr` and serve until the process is torn down.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server fails.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind intake listener on {addr}"))?;
        info!(%addr, "intake api listening");
        axum::serve(listener, self.router.into_make_service())
            .await
            .context("intake api server terminated unexpectedly")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{UPLOAD_REJECTED_MESSAGE, UPLOAD_SUCCESS_MESSAGE};
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use deckvault_core::TaskKind;
    use deckvault_drive::testing::{MemoryBroker, StubDriveStore};
    use deckvault_drive::{WorkerConfig, WorkerSupervisor};
    use deckvault_events::EventBus;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "deckvault-test-boundary";

    struct Harness {
        router: Router,
        store: Arc<StubDriveStore>,
        broker: Arc<MemoryBroker>,
    }

    fn harness() -> Harness {
        let store = Arc::new(StubDriveStore::default());
        let broker = Arc::new(MemoryBroker::default());
        let events = EventBus::new();
        let supervisor = Arc::new(WorkerSupervisor::new(
            broker.clone(),
            store.clone(),
            events,
            WorkerConfig::default(),
        ));
        let state = ApiState::new(store.clone(), broker.clone(), supervisor);
        Harness {
            router: ApiServer::new(state).router(),
            store,
            broker,
        }
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_part(name: &str, file_name: &str, payload: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        part.extend_from_slice(payload);
        part.extend_from_slice(b"\r\n");
        part
    }

    fn multipart_request(parts: Vec<Vec<u8>>) -> axum::http::Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(&part);
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        axum::http::Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn upload_organizes_inline_and_reports_success() {
        let harness = harness();
        let request = multipart_request(vec![
            file_part("ppt_file", "deck.pptx", b"slides"),
            text_part("parent_folder_id", "F123").into_bytes(),
        ]);

        let response = harness.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], UPLOAD_SUCCESS_MESSAGE);

        let calls = harness.store.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, TaskKind::OrganizeFile);
        assert_eq!(calls[0].destination_folder_id, "F123");
        assert_eq!(calls[0].file_name.as_deref(), Some("deck.pptx"));
    }

    #[tokio::test]
    async fn upload_without_a_file_is_rejected_with_the_caller_message() {
        let harness = harness();
        let request =
            multipart_request(vec![text_part("parent_folder_id", "F123").into_bytes()]);

        let response = harness.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], UPLOAD_REJECTED_MESSAGE);
        assert!(harness.store.calls().is_empty());
    }

    #[tokio::test]
    async fn upload_with_a_blank_folder_id_is_rejected() {
        let harness = harness();
        let request = multipart_request(vec![
            file_part("ppt_file", "deck.pptx", b"slides"),
            text_part("parent_folder_id", "   ").into_bytes(),
        ]);

        let response = harness.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], UPLOAD_REJECTED_MESSAGE);
    }

    #[tokio::test]
    async fn drive_rejection_surfaces_as_bad_gateway_with_detail() {
        let harness = harness();
        harness
            .store
            .reject_destination("F404", "destination folder does not exist");
        let request = multipart_request(vec![
            file_part("ppt_file", "deck.pptx", b"slides"),
            text_part("parent_folder_id", "F404").into_bytes(),
        ]);

        let response = harness.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"], "destination folder does not exist");
    }

    #[tokio::test]
    async fn health_reports_ok_when_the_queue_responds() {
        let harness = harness();
        let request = axum::http::Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request");

        let response = harness.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["worker"], "stopped");
        assert_eq!(body["pending_tasks"], 0);
    }

    #[tokio::test]
    async fn health_degrades_when_the_queue_is_unreachable() {
        let harness = harness();
        harness.broker.set_ping_failure(true);
        let request = axum::http::Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request");

        let response = harness.router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["queue_reachable"], false);
    }
}
