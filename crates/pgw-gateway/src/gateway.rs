//! # Validation Gateway
//!
//! Evaluates one request against every registered contract in registration
//! order and produces exactly one [`ValidationDecision`].
//!
//! Under [`MatchPolicy::FirstPassWins`]:
//!
//! 1. A contract with no route for the method and path is recorded as
//!    unmatched and skipped.
//! 2. A contract whose route matches and whose validation passes wins
//!    immediately; later contracts are not consulted.
//! 3. A contract whose route matches but whose validation fails is recorded
//!    and the next contract is tried.
//!
//! If no contract passes, the failure of the earliest matching contract is
//! reported, or `RouteNotFound` when nothing matched.
//!
//! Evaluation only reads the registry, so one gateway can be shared by any
//! number of concurrent requests.

use std::sync::Arc;

use pgw_contract::ContractRegistry;
use pgw_core::{FailureKind, Rejection, RequestDescriptor, ValidationAttempt, ValidationDecision};

use crate::classify::ErrorClassifier;
use crate::policy::MatchPolicy;

/// Counter of gateway decisions, labelled by `outcome`.
pub const DECISIONS_METRIC: &str = "pgw_gateway_decisions_total";

/// Request admission over an ordered contract registry.
#[derive(Debug, Clone)]
pub struct ValidationGateway {
    registry: Arc<ContractRegistry>,
    policy: MatchPolicy,
}

impl ValidationGateway {
    /// Gateway with the default [`MatchPolicy::FirstPassWins`] policy.
    pub fn new(registry: Arc<ContractRegistry>) -> Self {
        Self {
            registry,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    /// Decide whether `request` may proceed, and record the outcome.
    pub fn evaluate(&self, request: &RequestDescriptor) -> ValidationDecision {
        let (decision, attempts) = self.evaluate_with_attempts(request);
        let outcome = match &decision {
            ValidationDecision::Allowed(op) => {
                tracing::debug!(
                    contract = %op.contract,
                    operation_id = %op.route.operation_id,
                    method = %request.method(),
                    path = %request.path(),
                    "request admitted"
                );
                "allowed"
            }
            ValidationDecision::Rejected(rejection) => {
                tracing::debug!(
                    failure_kind = %rejection.kind,
                    detail = %rejection.detail,
                    method = %request.method(),
                    path = %request.path(),
                    attempts = attempts.len(),
                    "request rejected"
                );
                rejection.kind.as_str()
            }
        };
        record(outcome);
        decision
    }

    /// Reject a request whose method no contract can declare (`CONNECT`,
    /// extension methods). Counted and logged like any other rejection.
    pub fn reject_unsupported_method(&self, method: &str, path: &str) -> Rejection {
        let rejection = Rejection {
            kind: FailureKind::RouteNotFound,
            detail: String::new(),
        };
        tracing::debug!(
            failure_kind = %rejection.kind,
            method,
            path,
            "request rejected: unsupported method"
        );
        record(rejection.kind.as_str());
        rejection
    }

    /// Decide, returning every attempt made along the way.
    ///
    /// The attempts list ends at the winning or short-circuiting contract;
    /// contracts after it are not evaluated and do not appear.
    pub fn evaluate_with_attempts(&self, request: &RequestDescriptor) -> (ValidationDecision, Vec<ValidationAttempt>) {
        let mut attempts = Vec::with_capacity(self.registry.len());
        for (index, validator) in self.registry.validators().iter().enumerate() {
            let Some(route) = validator.find_route(request.method(), request.path()) else {
                attempts.push(ValidationAttempt::unmatched(index));
                continue;
            };
            match validator.validate(&route, request) {
                Ok(()) => return (ValidationDecision::allow(index, validator.name(), route), attempts),
                Err(failure) => {
                    attempts.push(ValidationAttempt::failed(index, failure));
                    if self.policy == MatchPolicy::RejectOnFirstMatch {
                        break;
                    }
                }
            }
        }
        let rejection = ErrorClassifier::select(&attempts);
        (ValidationDecision::Rejected(rejection), attempts)
    }
}

fn record(outcome: &'static str) {
    metrics::counter!(DECISIONS_METRIC, "outcome" => outcome).increment(1);
}
