//! # pgw-api — Contract-Validation Gateway Service
//!
//! Axum service that admits a request to downstream handling only when one
//! of the registered OpenAPI contracts declares its route and the request
//! conforms to that operation.
//!
//! ## Routes
//!
//! - `GET /` and `GET /health-check`: served without validation.
//! - `GET /metrics`: Prometheus scrape endpoint, when metrics are enabled.
//! - everything else: evaluated by the validation middleware; admitted
//!   requests reach the passthrough handler with a [`MatchedOperation`].
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → ValidationMiddleware → Handler
//!
//! ## Error Responses
//!
//! Rejections are `{"error": <message>}` with status 404 (no route),
//! 400 (schema violation), 401 (security requirement) or 413 (body limit).

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use pgw_contract::{ContractRegistry, ContractSource};
use pgw_core::ContractLoadError;
use pgw_gateway::ValidationGateway;

pub use config::AppConfig;
pub use error::ApiError;
pub use extractors::MatchedOperation;
pub use state::AppState;

/// Load the configured contracts, in order, into a gateway.
///
/// Any contract that fails to load fails the whole call; the service must
/// not start without its full contract set.
pub fn build_gateway(config: &AppConfig) -> Result<ValidationGateway, ContractLoadError> {
    let sources = config.contracts.iter().map(ContractSource::from_file).collect();
    let registry = ContractRegistry::load(sources)?;
    Ok(ValidationGateway::new(Arc::new(registry)).with_policy(config.match_policy))
}

/// Assemble the application router.
///
/// `GET /`, `GET /health-check` and `GET /metrics` are served outside the
/// validation middleware so they never consult the contracts. Any other
/// method on those paths, and every other path, goes through the gateway.
pub fn app(state: AppState) -> Router {
    let validated = Router::new()
        .fallback(routes::passthrough::echo)
        .layer(from_fn_with_state(state.clone(), middleware::validation::validation_middleware));

    let mut unvalidated = routes::health::router(validated.clone());
    if let Some(handle) = state.metrics.clone() {
        unvalidated = unvalidated.route(
            "/metrics",
            get(move || std::future::ready(handle.render()))
                .head_service(validated.clone())
                .fallback_service(validated.clone()),
        );
    }

    Router::new()
        .merge(unvalidated)
        .merge(validated)
        .layer(middleware::tracing_layer::layer())
}
