//! HTTP error mapping.
//!
//! Every failure leaves the API as `{"error": <detail>}` with a status that
//! reflects who is at fault: the caller (400), the drive service (502), or
//! this process (500, 503).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deckvault_core::OrganizeError;
use serde_json::json;

/// An error response the handlers can return with `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// Caller-fault response.
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    /// The drive collaborator rejected or could not serve the request.
    #[must_use]
    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            detail: detail.into(),
        }
    }

    /// Something in this process failed.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }

    /// Status the response will carry.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Human-readable detail placed in the `error` field.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<OrganizeError> for ApiError {
    fn from(err: OrganizeError) -> Self {
        let detail = err.detail();
        match err {
            OrganizeError::Validation { .. } => Self::bad_request(detail),
            OrganizeError::Rejected { .. } | OrganizeError::Unavailable { .. } => {
                Self::bad_gateway(detail)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organize_errors_map_to_caller_or_upstream_fault() {
        let validation = ApiError::from(OrganizeError::Validation {
            field: "file",
            reason: "empty",
        });
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let rejected = ApiError::from(OrganizeError::Rejected {
            detail: "folder not found".into(),
        });
        assert_eq!(rejected.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(rejected.detail(), "folder not found");

        let unavailable = ApiError::from(OrganizeError::Unavailable {
            source: "connection refused".into(),
        });
        assert_eq!(unavailable.status(), StatusCode::BAD_GATEWAY);
    }
}
