//! # Application State
//!
//! Shared, read-only state handed to the validation middleware and routes.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use pgw_gateway::ValidationGateway;

use crate::config::DEFAULT_BODY_LIMIT;

#[derive(Clone)]
pub struct AppState {
    /// The gateway every non-bypassed request is evaluated by.
    pub gateway: Arc<ValidationGateway>,
    /// Maximum request body size buffered for validation.
    pub body_limit: usize,
    /// Prometheus scrape handle; `/metrics` is mounted only when present.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gateway", &self.gateway)
            .field("body_limit", &self.body_limit)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// State with the default body limit and no metrics endpoint.
    pub fn new(gateway: ValidationGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            body_limit: DEFAULT_BODY_LIMIT,
            metrics: None,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
