//! # Error Classification
//!
//! Picks the failure to report from a request's attempts and maps it to an
//! HTTP status and message. Load errors never reach this point.

use pgw_core::{FailureKind, Rejection, ValidationAttempt};
use serde::Serialize;

/// Message returned when no contract declares the requested route.
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "no matching operation was found";

/// HTTP status and client-facing message for a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: u16,
    pub message: String,
}

/// Stateless mapping from attempts and rejections to responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// The rejection to report once every contract has been tried: the
    /// failure of the first contract (in registration order) whose route
    /// matched, or `RouteNotFound` when none matched.
    pub fn select(attempts: &[ValidationAttempt]) -> Rejection {
        attempts
            .iter()
            .find_map(|attempt| {
                attempt.failure.as_ref().filter(|_| attempt.matched).map(|failure| Rejection {
                    kind: failure.kind(),
                    detail: failure.detail().to_string(),
                })
            })
            .unwrap_or_else(|| Rejection {
                kind: FailureKind::RouteNotFound,
                detail: String::new(),
            })
    }

    /// Map a rejection to its status and message.
    pub fn classify(rejection: &Rejection) -> Classification {
        let (status, fallback) = match rejection.kind {
            FailureKind::RouteNotFound => {
                return Classification {
                    status: 404,
                    message: ROUTE_NOT_FOUND_MESSAGE.to_string(),
                }
            }
            FailureKind::SchemaError => (400, "request does not conform to the declared schema"),
            FailureKind::SecurityError => (401, "security requirement not satisfied"),
        };
        let message = if rejection.detail.is_empty() {
            fallback.to_string()
        } else {
            rejection.detail.clone()
        };
        Classification { status, message }
    }
}
