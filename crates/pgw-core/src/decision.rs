//! # Match and Decision Types
//!
//! Transient per-request values produced while the gateway walks the
//! registered contracts. A [`ValidationDecision`] is either an allow that
//! carries exactly one contract's operation and path parameters, or a
//! rejection that carries none. The constructors are the only way to build
//! one, so a partially applied match cannot be represented.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{FailureKind, ValidationFailure};

/// Path parameters extracted from a templated path, keyed by variable name.
pub type PathParams = BTreeMap<String, String>;

/// A declared operation paired with the parameters bound from the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    /// The matched operation's `operationId`.
    pub operation_id: String,
    /// The declared path template, e.g. `/profiles/{id}`.
    pub path_template: String,
    /// Values bound to each template variable.
    pub path_params: PathParams,
}

/// One contract's outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationAttempt {
    /// Registration index of the contract.
    pub contract_index: usize,
    /// Whether the contract declared a route for the method and path.
    pub matched: bool,
    /// Why validation failed, when the route matched but did not pass.
    pub failure: Option<ValidationFailure>,
}

impl ValidationAttempt {
    /// The contract declared no route for the request.
    pub fn unmatched(contract_index: usize) -> Self {
        Self {
            contract_index,
            matched: false,
            failure: None,
        }
    }

    /// The contract matched the route but validation failed.
    pub fn failed(contract_index: usize, failure: ValidationFailure) -> Self {
        Self {
            contract_index,
            matched: true,
            failure: Some(failure),
        }
    }

    /// Failure kind, if validation failed.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(ValidationFailure::kind)
    }

    /// Failure detail, or an empty string.
    pub fn detail(&self) -> &str {
        self.failure.as_ref().map_or("", ValidationFailure::detail)
    }
}

/// Why a request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Taxonomy kind.
    pub kind: FailureKind,
    /// Violation detail; empty for `RouteNotFound`.
    pub detail: String,
}

/// The operation a request was admitted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowedOperation {
    /// Registration index of the winning contract.
    pub contract_index: usize,
    /// Name of the winning contract.
    pub contract: String,
    /// The route match produced by that contract.
    #[serde(flatten)]
    pub route: RouteMatch,
}

/// The gateway's final output for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationDecision {
    /// Exactly one contract matched and passed.
    Allowed(AllowedOperation),
    /// No contract produced a full pass.
    Rejected(Rejection),
}

impl ValidationDecision {
    /// Build an allow decision for the contract at `contract_index`.
    pub fn allow(contract_index: usize, contract: impl Into<String>, route: RouteMatch) -> Self {
        Self::Allowed(AllowedOperation {
            contract_index,
            contract: contract.into(),
            route,
        })
    }

    /// Build a rejection.
    pub fn reject(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Rejected(Rejection {
            kind,
            detail: detail.into(),
        })
    }

    /// Whether the request may proceed.
    pub fn allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// The admitted operation, if allowed.
    pub fn operation(&self) -> Option<&AllowedOperation> {
        match self {
            Self::Allowed(op) => Some(op),
            Self::Rejected(_) => None,
        }
    }

    /// The matched `operationId`, if allowed.
    pub fn operation_id(&self) -> Option<&str> {
        self.operation().map(|op| op.route.operation_id.as_str())
    }

    /// The extracted path parameters, if allowed.
    pub fn path_params(&self) -> Option<&PathParams> {
        self.operation().map(|op| &op.route.path_params)
    }

    /// The rejection, if not allowed.
    pub fn failure(&self) -> Option<&Rejection> {
        match self {
            Self::Allowed(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}
