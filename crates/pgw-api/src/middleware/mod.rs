//! # Middleware Modules
//!
//! Tower middleware layers for the gateway service.

pub mod tracing_layer;
pub mod validation;
