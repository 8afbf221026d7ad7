//! # pgw-core — Foundational Types for the Contract-Validation Gateway
//!
//! This crate is the leaf of the workspace dependency graph. It defines the
//! values that flow between the contract registry, the validation gateway,
//! and the HTTP layer:
//!
//! - [`RequestDescriptor`]: the framework-independent view of one inbound
//!   HTTP request (method, path, headers, query, body, content type).
//! - [`RouteMatch`], [`ValidationAttempt`], [`ValidationDecision`]: the
//!   transient per-request results of matching and validation.
//! - [`FailureKind`], [`ValidationFailure`], [`ContractLoadError`]: the
//!   failure taxonomy. Load errors are startup-only; the other kinds are
//!   resolved per request.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pgw-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod decision;
pub mod error;
pub mod request;

pub use decision::{
    AllowedOperation, PathParams, Rejection, RouteMatch, ValidationAttempt, ValidationDecision,
};
pub use error::{ContractLoadError, FailureKind, SpecLoadError, ValidationFailure};
pub use request::{HttpMethod, RequestDescriptor};
