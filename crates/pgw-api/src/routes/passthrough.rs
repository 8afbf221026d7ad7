//! Downstream stand-in for admitted requests.
//!
//! The business handlers behind the gateway are not part of this service.
//! This handler answers every admitted request with the operation it was
//! matched to, which is enough to observe gateway decisions end to end.

use axum::Json;

use crate::extractors::MatchedOperation;

pub async fn echo(operation: MatchedOperation) -> Json<MatchedOperation> {
    tracing::debug!(
        contract = %operation.contract,
        operation_id = %operation.operation_id,
        "forwarded admitted request"
    );
    Json(operation)
}
