//! # pgw-gateway — Request Admission over Multiple Contracts
//!
//! [`ValidationGateway`] evaluates a
//! [`RequestDescriptor`](pgw_core::RequestDescriptor) against every
//! contract in a [`ContractRegistry`](pgw_contract::ContractRegistry) and
//! returns one [`ValidationDecision`](pgw_core::ValidationDecision).
//! [`ErrorClassifier`] turns a rejection into an HTTP status and message.
//!
//! The gateway is synchronous and performs no I/O. Each decision increments
//! the `pgw_gateway_decisions_total` counter, labelled by outcome, through
//! the `metrics` facade; without an installed recorder this is a no-op.

pub mod classify;
pub mod gateway;
pub mod policy;

pub use classify::{Classification, ErrorClassifier, ROUTE_NOT_FOUND_MESSAGE};
pub use gateway::{ValidationGateway, DECISIONS_METRIC};
pub use policy::{MatchPolicy, UnknownMatchPolicy};
