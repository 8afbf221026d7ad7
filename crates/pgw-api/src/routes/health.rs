//! Liveness endpoints. Only `GET` is served here; every other method on
//! these paths is handed to `gateway`, the validated service.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn router(gateway: Router) -> Router {
    Router::new()
        .route(
            "/",
            get(hello)
                .head_service(gateway.clone())
                .fallback_service(gateway.clone()),
        )
        .route(
            "/health-check",
            get(health_check)
                .head_service(gateway.clone())
                .fallback_service(gateway),
        )
}

async fn hello() -> &'static str {
    "Hello, World!"
}

async fn health_check() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
