//! # Request Validator Capability
//!
//! [`RequestValidator`] is the one seam the gateway evaluates requests
//! through. [`Contract`] is the OpenAPI-backed implementation; others can be
//! registered alongside it with
//! [`ContractRegistry::from_validators`](crate::ContractRegistry::from_validators).

use pgw_core::{ContractLoadError, HttpMethod, RequestDescriptor, RouteMatch, ValidationFailure};
use serde::Serialize;
use serde_json::Value;

use crate::document::{self, ContractDocument};
use crate::refs::{check_references, normalize_schemas};
use crate::router::RouteMatcher;
use crate::schema::SchemaValidator;

/// Route lookup and request validation for one contract.
///
/// Implementations are immutable once built and are shared across
/// concurrently executing requests.
pub trait RequestValidator: Send + Sync {
    /// Name the contract was registered under.
    fn name(&self) -> &str;

    /// Find the operation declared for `method` on `path`.
    fn find_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch>;

    /// Validate a request against the operation `route` identifies.
    fn validate(&self, route: &RouteMatch, request: &RequestDescriptor) -> Result<(), ValidationFailure>;

    /// Descriptive summary for startup logs and the `check` command.
    fn summary(&self) -> ContractSummary;
}

/// What a loaded contract declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractSummary {
    pub name: String,
    pub title: String,
    pub version: String,
    pub routes: usize,
    pub operations: usize,
}

/// An OpenAPI contract with its route index and compiled schemas.
#[derive(Debug)]
pub struct Contract {
    name: String,
    title: String,
    version: String,
    operations: usize,
    matcher: RouteMatcher,
    validator: SchemaValidator,
}

impl Contract {
    /// Self-validate a raw document and build its matcher and validator.
    ///
    /// References are checked before anything is parsed, and the OpenAPI 3.0
    /// schema dialect is normalized before schemas are compiled.
    pub fn build(name: &str, mut root: Value) -> Result<Self, ContractLoadError> {
        check_references(name, &root)?;
        normalize_schemas(&mut root);
        let document = document::parse(name, &root)?;
        let validator = SchemaValidator::new(&document, &root)?;
        Ok(Self::assemble(document, validator))
    }

    fn assemble(document: ContractDocument, validator: SchemaValidator) -> Self {
        Self {
            matcher: RouteMatcher::new(&document),
            operations: document.operations.len(),
            name: document.name,
            title: document.title,
            version: document.version,
            validator,
        }
    }
}

impl RequestValidator for Contract {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch> {
        self.matcher.find_route(method, path)
    }

    fn validate(&self, route: &RouteMatch, request: &RequestDescriptor) -> Result<(), ValidationFailure> {
        self.validator.validate(route, request)
    }

    fn summary(&self) -> ContractSummary {
        ContractSummary {
            name: self.name.clone(),
            title: self.title.clone(),
            version: self.version.clone(),
            routes: self.matcher.route_count(),
            operations: self.operations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "openapi": "3.1.0",
            "info": {"title": "Pets", "version": "2.0.0"},
            "paths": {
                "/pets": {
                    "get": {"operationId": "listPets"},
                    "post": {
                        "operationId": "createPet",
                        "requestBody": {"required": true, "content": {"application/json": {"schema": {
                            "type": "object", "required": ["name"], "properties": {"name": {"type": "string"}}
                        }}}}
                    }
                }
            }
        })
    }

    #[test]
    fn contract_routes_and_validates() {
        let contract = Contract::build("pets", doc()).unwrap();
        let route = contract.find_route(HttpMethod::Post, "/pets").unwrap();
        assert_eq!(route.operation_id, "createPet");

        let ok = RequestDescriptor::new(HttpMethod::Post, "/pets").with_json(&json!({"name": "Rex"}));
        contract.validate(&route, &ok).unwrap();

        let bad = RequestDescriptor::new(HttpMethod::Post, "/pets").with_json(&json!({}));
        let err = contract.validate(&route, &bad).unwrap_err();
        assert!(err.detail().contains("name"), "got: {err}");
    }

    #[test]
    fn summary_counts_routes_and_operations() {
        let contract = Contract::build("pets", doc()).unwrap();
        assert_eq!(
            contract.summary(),
            ContractSummary {
                name: "pets".into(),
                title: "Pets".into(),
                version: "2.0.0".into(),
                routes: 1,
                operations: 2,
            }
        );
    }

    #[test]
    fn dangling_reference_fails_before_parsing() {
        let mut d = doc();
        d["paths"]["/pets"]["get"]["parameters"] = json!([{"$ref": "#/components/parameters/Missing"}]);
        let err = Contract::build("pets", d).unwrap_err();
        assert!(matches!(err, ContractLoadError::DanglingReference { .. }), "got: {err}");
    }

    #[test]
    fn contract_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Contract>();
    }
}
