//! # Route Modules
//!
//! - [`health`]: `GET /` and `GET /health-check`, served without validation.
//! - [`passthrough`]: the downstream handler admitted requests reach.

pub mod health;
pub mod passthrough;
