//! # API Error Types
//!
//! Every error the service returns is a JSON object with a single `error`
//! string, e.g. `{"error": "no matching operation was found"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pgw_gateway::{Classification, ErrorClassifier};
use pgw_core::Rejection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors surfaced by the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The gateway rejected the request; status and message come from the classifier.
    #[error("{}", .0.message)]
    Rejected(Classification),

    /// The request body exceeds the configured limit (413).
    #[error("request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    /// The request body could not be read (400).
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// A handler expected a matched operation but the gateway did not run (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Classify a gateway rejection.
    pub fn rejected(rejection: &Rejection) -> Self {
        Self::Rejected(ErrorClassifier::classify(rejection))
    }

    /// HTTP status for this error.
    fn status(&self) -> StatusCode {
        match self {
            Self::Rejected(c) => StatusCode::from_u16(c.status).unwrap_or(StatusCode::BAD_REQUEST),
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pgw_core::FailureKind;

    fn rejection(kind: FailureKind, detail: &str) -> Rejection {
        Rejection {
            kind,
            detail: detail.to_string(),
        }
    }

    async fn response_parts(err: ApiError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn rejection_statuses() {
        assert_eq!(ApiError::rejected(&rejection(FailureKind::RouteNotFound, "")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::rejected(&rejection(FailureKind::SchemaError, "x")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::rejected(&rejection(FailureKind::SecurityError, "x")).status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn transport_statuses() {
        assert_eq!(ApiError::PayloadTooLarge { limit: 10 }.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::BodyRead("reset".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn route_not_found_body() {
        let (status, body) = response_parts(ApiError::rejected(&rejection(FailureKind::RouteNotFound, ""))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "no matching operation was found");
    }

    #[tokio::test]
    async fn schema_error_body_carries_detail() {
        let (status, body) = response_parts(ApiError::rejected(&rejection(
            FailureKind::SchemaError,
            "request body: \"first_name\" is a required property",
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("first_name"));
    }

    #[tokio::test]
    async fn internal_error_is_not_exposed() {
        let (status, body) = response_parts(ApiError::Internal("extension missing".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.contains("extension"));
    }
}
