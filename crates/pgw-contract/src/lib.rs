//! # pgw-contract — Contract Loading, Route Matching & Request Validation
//!
//! Turns OpenAPI 3.x documents into the per-contract components the gateway
//! evaluates requests with.
//!
//! ## Loading (`source`, `refs`, `document`)
//!
//! A [`ContractSource`] produces one document (YAML or JSON, converted to a
//! JSON value). The document is self-validated before anything is built:
//! every `$ref` must be local and resolve, the OpenAPI structure must be
//! well formed, and every schema must compile. Any failure is a
//! [`ContractLoadError`](pgw_core::ContractLoadError), which is fatal at
//! startup.
//!
//! ## Matching (`router`)
//!
//! [`RouteMatcher`] indexes one contract's paths. Literal paths are tried
//! before templated ones; templated paths keep document order.
//!
//! ## Validation (`schema`, `security`)
//!
//! [`SchemaValidator`] checks security requirements, parameters and the
//! request body of a matched operation, returning the first violation.
//!
//! ## Registry (`validator`, `registry`)
//!
//! [`RequestValidator`] is the capability the gateway depends on;
//! [`Contract`] implements it. [`ContractRegistry`] holds the validators in
//! registration order.
//!
//! ## Crate Policy
//!
//! - Depends only on `pgw-core` internally.
//! - No I/O after load. Schema validation never follows external references.

pub mod document;
pub mod refs;
pub mod registry;
pub mod router;
pub mod schema;
pub mod security;
pub mod source;
pub mod validator;

pub use document::{ContractDocument, Operation, ParameterLocation};
pub use registry::ContractRegistry;
pub use router::RouteMatcher;
pub use schema::SchemaValidator;
pub use source::{parse_document, ContractSource, DocumentFormat};
pub use validator::{Contract, ContractSummary, RequestValidator};
