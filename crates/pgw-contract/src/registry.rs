//! # Contract Registry
//!
//! The ordered set of contracts a gateway consults. Built once at startup,
//! read-only afterwards. Registration order is precedence order.

use std::fmt;

use pgw_core::ContractLoadError;

use crate::source::ContractSource;
use crate::validator::{Contract, ContractSummary, RequestValidator};

/// Ordered, immutable collection of request validators.
pub struct ContractRegistry {
    validators: Vec<Box<dyn RequestValidator>>,
}

impl fmt::Debug for ContractRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("contracts", &self.validators.iter().map(|v| v.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl ContractRegistry {
    /// Invoke every source once, in order, and build a contract from each.
    ///
    /// The first source that fails to produce a document, or whose document
    /// fails self-validation, fails the whole load.
    pub fn load(sources: Vec<ContractSource>) -> Result<Self, ContractLoadError> {
        if sources.is_empty() {
            return Err(ContractLoadError::NoContracts);
        }
        let mut validators: Vec<Box<dyn RequestValidator>> = Vec::with_capacity(sources.len());
        for source in &sources {
            let document = source.load()?;
            let contract = Contract::build(source.name(), document)?;
            let summary = contract.summary();
            tracing::info!(
                contract = %summary.name,
                title = %summary.title,
                version = %summary.version,
                routes = summary.routes,
                operations = summary.operations,
                "registered contract"
            );
            validators.push(Box::new(contract));
        }
        Ok(Self { validators })
    }

    /// Build a registry from already constructed validators.
    pub fn from_validators(validators: Vec<Box<dyn RequestValidator>>) -> Result<Self, ContractLoadError> {
        if validators.is_empty() {
            return Err(ContractLoadError::NoContracts);
        }
        Ok(Self { validators })
    }

    /// Validators in registration order.
    pub fn validators(&self) -> &[Box<dyn RequestValidator>] {
        &self.validators
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Always false for a loaded registry; provided for API completeness.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn summaries(&self) -> Vec<ContractSummary> {
        self.validators.iter().map(|v| v.summary()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DocumentFormat;
    use serde_json::json;

    const PETS: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: 1.0.0
paths:
  /pets:
    get:
      operationId: listPets
"#;

    #[test]
    fn empty_source_list_is_rejected() {
        let err = ContractRegistry::load(Vec::new()).unwrap_err();
        assert!(matches!(err, ContractLoadError::NoContracts));
    }

    #[test]
    fn sources_keep_registration_order() {
        let registry = ContractRegistry::load(vec![
            ContractSource::from_text("pets", PETS, DocumentFormat::Yaml),
            ContractSource::from_value(
                "status",
                json!({"openapi": "3.0.3", "info": {"title": "Status", "version": "1"}, "paths": {"/status": {"get": {}}}}),
            ),
        ])
        .unwrap();
        let names: Vec<_> = registry.validators().iter().map(|v| v.name().to_string()).collect();
        assert_eq!(names, ["pets", "status"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.summaries()[1].title, "Status");
    }

    #[test]
    fn failing_source_fails_the_whole_load() {
        let err = ContractRegistry::load(vec![
            ContractSource::from_text("pets", PETS, DocumentFormat::Yaml),
            ContractSource::from_fn("broken", |name| {
                Err(ContractLoadError::Source {
                    contract: name.to_string(),
                    reason: "unreachable".into(),
                })
            }),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("broken"), "got: {err}");
    }

    #[test]
    fn each_source_is_invoked_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        ContractRegistry::load(vec![ContractSource::from_fn("pets", move |name| {
            counter.fetch_add(1, Ordering::SeqCst);
            crate::source::parse_document(name, PETS, DocumentFormat::Yaml)
        })])
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_validator_list_is_rejected() {
        assert!(matches!(
            ContractRegistry::from_validators(Vec::new()),
            Err(ContractLoadError::NoContracts)
        ));
    }
}
