//! # Matched Operation Extractor
//!
//! The validation middleware attaches a [`MatchedOperation`] to every
//! admitted request. Downstream handlers read it with the extractor below.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pgw_core::{AllowedOperation, PathParams};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// The operation a request was admitted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedOperation {
    pub contract: String,
    pub operation_id: String,
    pub path_template: String,
    pub path_params: PathParams,
}

impl From<AllowedOperation> for MatchedOperation {
    fn from(op: AllowedOperation) -> Self {
        Self {
            contract: op.contract,
            operation_id: op.route.operation_id,
            path_template: op.route.path_template,
            path_params: op.route.path_params,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MatchedOperation {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<MatchedOperation>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("no matched operation in request context".into()))
    }
}
