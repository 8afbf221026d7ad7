//! # Error Types — Failure Taxonomy
//!
//! Two families of errors exist and they never mix:
//!
//! - [`ContractLoadError`] is raised while contracts are loaded at startup.
//!   It is fatal: a process that hits it must not serve traffic.
//! - [`ValidationFailure`] is raised per request by a contract's validator
//!   after a route matched. Together with "no route" it forms the
//!   [`FailureKind`] taxonomy the gateway classifies into HTTP responses.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-request failure kinds, ordered from least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No contract declares the requested method and path.
    RouteNotFound,
    /// A route matched but request fields violate the declared schema.
    SchemaError,
    /// A route matched but a declared security requirement is unmet.
    SecurityError,
}

impl FailureKind {
    /// Stable snake_case label, used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RouteNotFound => "route_not_found",
            Self::SchemaError => "schema_error",
            Self::SecurityError => "security_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A matched request failed validation against its operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// Parameters or body do not conform to the declared schema.
    #[error("{0}")]
    Schema(String),

    /// A declared security requirement is not satisfied.
    #[error("{0}")]
    Security(String),
}

impl ValidationFailure {
    /// Construct a schema failure.
    pub fn schema(detail: impl Into<String>) -> Self {
        Self::Schema(detail.into())
    }

    /// Construct a security failure.
    pub fn security(detail: impl Into<String>) -> Self {
        Self::Security(detail.into())
    }

    /// The taxonomy kind of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Schema(_) => FailureKind::SchemaError,
            Self::Security(_) => FailureKind::SecurityError,
        }
    }

    /// The human-readable violation.
    pub fn detail(&self) -> &str {
        match self {
            Self::Schema(detail) | Self::Security(detail) => detail,
        }
    }
}

/// A contract could not be loaded or failed structural self-validation.
///
/// Every variant names the contract so the operator can tell which source
/// halted startup.
#[derive(Error, Debug)]
pub enum ContractLoadError {
    /// No contract sources were supplied.
    #[error("no contract sources were registered")]
    NoContracts,

    /// The source failed to produce a document at all.
    #[error("contract source '{contract}' failed to produce a document: {reason}")]
    Source {
        /// Contract source name.
        contract: String,
        /// Reason the source failed.
        reason: String,
    },

    /// The document text could not be parsed as YAML or JSON.
    #[error("contract '{contract}' could not be parsed: {reason}")]
    Parse {
        /// Contract source name.
        contract: String,
        /// Parser error.
        reason: String,
    },

    /// The document is parseable but violates the contract structure.
    #[error("contract '{contract}' is invalid at '{pointer}': {reason}")]
    Structure {
        /// Contract source name.
        contract: String,
        /// JSON Pointer of the offending node.
        pointer: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `$ref` does not resolve inside the document.
    #[error("contract '{contract}' has a dangling reference '{reference}' at '{pointer}'")]
    DanglingReference {
        /// Contract source name.
        contract: String,
        /// JSON Pointer of the `$ref` node.
        pointer: String,
        /// The reference string.
        reference: String,
    },

    /// A schema in the document could not be compiled into a validator.
    #[error("contract '{contract}' schema at '{pointer}' does not compile: {reason}")]
    SchemaCompile {
        /// Contract source name.
        contract: String,
        /// JSON Pointer of the schema.
        pointer: String,
        /// Compiler error.
        reason: String,
    },
}

/// Name used throughout the service for a fatal contract load failure.
pub type SpecLoadError = ContractLoadError;

impl ContractLoadError {
    /// Shorthand for a [`ContractLoadError::Structure`] error.
    pub fn structure(
        contract: impl Into<String>,
        pointer: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Structure {
            contract: contract.into(),
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_labels_are_stable() {
        assert_eq!(FailureKind::RouteNotFound.as_str(), "route_not_found");
        assert_eq!(FailureKind::SchemaError.as_str(), "schema_error");
        assert_eq!(FailureKind::SecurityError.as_str(), "security_error");
        assert_eq!(FailureKind::SchemaError.to_string(), "schema_error");
    }

    #[test]
    fn failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::SecurityError).unwrap();
        assert_eq!(json, "\"security_error\"");
    }

    #[test]
    fn validation_failure_kind_and_detail() {
        let schema = ValidationFailure::schema("missing first_name");
        assert_eq!(schema.kind(), FailureKind::SchemaError);
        assert_eq!(schema.detail(), "missing first_name");
        assert_eq!(schema.to_string(), "missing first_name");

        let security = ValidationFailure::security("missing bearer token");
        assert_eq!(security.kind(), FailureKind::SecurityError);
        assert_eq!(security.detail(), "missing bearer token");
    }

    #[test]
    fn load_error_messages_name_the_contract() {
        let err = ContractLoadError::structure("profiles", "/paths", "must be a mapping");
        let msg = err.to_string();
        assert!(msg.contains("profiles"));
        assert!(msg.contains("/paths"));
        assert!(msg.contains("must be a mapping"));

        let err = ContractLoadError::DanglingReference {
            contract: "profiles".into(),
            pointer: "/paths/~1profiles/post".into(),
            reference: "#/components/schemas/Missing".into(),
        };
        assert!(err.to_string().contains("#/components/schemas/Missing"));
    }
}
