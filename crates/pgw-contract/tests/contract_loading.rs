//! Integration tests: load fixture contracts from disk and exercise route
//! matching and request validation through the registry.

use std::io::Write;
use std::path::PathBuf;

use pgw_contract::{ContractRegistry, ContractSource, RequestValidator};
use pgw_core::{ContractLoadError, FailureKind, HttpMethod, RequestDescriptor};
use proptest::prelude::*;
use serde_json::json;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn profiles() -> ContractRegistry {
    ContractRegistry::load(vec![ContractSource::from_file(fixture("profiles.yaml"))]).unwrap()
}

fn upsert_body() -> serde_json::Value {
    json!({
        "first_name": "Grace",
        "middle_name": null,
        "last_name": "Hopper",
        "gender": "FEMALE",
        "class": "A",
        "skills": [{"skill": "COBOL", "detail": "compiler"}]
    })
}

#[test]
fn profiles_fixture_loads_with_file_stem_name() {
    let registry = profiles();
    let summary = &registry.summaries()[0];
    assert_eq!(summary.name, "profiles");
    assert_eq!(summary.title, "Profiles");
    assert_eq!(summary.routes, 2);
    assert_eq!(summary.operations, 5);
}

#[test]
fn templated_route_binds_id() {
    let registry = profiles();
    let contract = &registry.validators()[0];
    let route = contract.find_route(HttpMethod::Get, "/profiles/123").unwrap();
    assert_eq!(route.operation_id, "getProfileById");
    assert_eq!(route.path_params.get("id").map(String::as_str), Some("123"));
    contract
        .validate(&route, &RequestDescriptor::new(HttpMethod::Get, "/profiles/123"))
        .unwrap();
}

#[test]
fn empty_body_names_first_missing_field() {
    let registry = profiles();
    let contract = &registry.validators()[0];
    let route = contract.find_route(HttpMethod::Post, "/profiles").unwrap();
    let request = RequestDescriptor::new(HttpMethod::Post, "/profiles").with_json(&json!({}));
    let err = contract.validate(&route, &request).unwrap_err();
    assert_eq!(err.kind(), FailureKind::SchemaError);
    assert!(err.detail().contains("first_name"), "got: {err}");
}

#[test]
fn full_profile_passes_and_bad_skill_fails() {
    let registry = profiles();
    let contract = &registry.validators()[0];
    let route = contract.find_route(HttpMethod::Put, "/profiles/abc").unwrap();

    let ok = RequestDescriptor::new(HttpMethod::Put, "/profiles/abc").with_json(&upsert_body());
    contract.validate(&route, &ok).unwrap();

    let mut body = upsert_body();
    body["skills"][0] = json!({"detail": "no skill name"});
    let bad = RequestDescriptor::new(HttpMethod::Put, "/profiles/abc").with_json(&body);
    let err = contract.validate(&route, &bad).unwrap_err();
    assert!(err.detail().contains("/skills/0"), "got: {err}");
}

#[test]
fn pagination_parameters_are_typed() {
    let registry = profiles();
    let contract = &registry.validators()[0];
    let route = contract.find_route(HttpMethod::Get, "/profiles").unwrap();

    let ok = RequestDescriptor::new(HttpMethod::Get, "/profiles").with_query_string("page=1&per_page=20");
    contract.validate(&route, &ok).unwrap();

    let too_many = RequestDescriptor::new(HttpMethod::Get, "/profiles").with_query_string("per_page=500");
    let err = contract.validate(&route, &too_many).unwrap_err();
    assert!(err.detail().contains("per_page"), "got: {err}");
}

#[test]
fn delete_requires_bearer_token() {
    let registry = profiles();
    let contract = &registry.validators()[0];
    let route = contract.find_route(HttpMethod::Delete, "/profiles/1").unwrap();

    let anonymous = RequestDescriptor::new(HttpMethod::Delete, "/profiles/1");
    let err = contract.validate(&route, &anonymous).unwrap_err();
    assert_eq!(err.kind(), FailureKind::SecurityError);

    let authorized = anonymous.with_header("Authorization", "Bearer token");
    contract.validate(&route, &authorized).unwrap();
}

#[test]
fn head_is_not_served_by_get_operations() {
    let registry = profiles();
    let contract = &registry.validators()[0];
    assert!(contract.find_route(HttpMethod::Head, "/profiles").is_none());
    assert!(contract.find_route(HttpMethod::Head, "/profiles/123").is_none());
}

#[test]
fn body_on_list_operation_is_ignored() {
    let registry = profiles();
    let contract = &registry.validators()[0];
    let route = contract.find_route(HttpMethod::Get, "/profiles").unwrap();
    let request = RequestDescriptor::new(HttpMethod::Get, "/profiles")
        .with_query_string("page=1")
        .with_json(&json!({"first_name": 42}));
    contract.validate(&route, &request).unwrap();
}

#[test]
fn two_variables_in_one_segment_validate_independently() {
    let doc = json!({
        "openapi": "3.1.0",
        "info": {"title": "Files", "version": "1"},
        "paths": {
            "/files/{name}.{ext}": {"get": {"operationId": "getFile", "parameters": [
                {"name": "name", "in": "path", "required": true, "schema": {"type": "string"}},
                {"name": "ext", "in": "path", "required": true, "schema": {"enum": ["pdf", "txt"]}}
            ]}}
        }
    });
    let registry = ContractRegistry::load(vec![ContractSource::from_value("files", doc)]).unwrap();
    let contract = &registry.validators()[0];

    let route = contract.find_route(HttpMethod::Get, "/files/report.pdf").unwrap();
    assert_eq!(route.path_params.get("name").map(String::as_str), Some("report"));
    assert_eq!(route.path_params.get("ext").map(String::as_str), Some("pdf"));
    contract
        .validate(&route, &RequestDescriptor::new(HttpMethod::Get, "/files/report.pdf"))
        .unwrap();

    let route = contract.find_route(HttpMethod::Get, "/files/report.exe").unwrap();
    let err = contract
        .validate(&route, &RequestDescriptor::new(HttpMethod::Get, "/files/report.exe"))
        .unwrap_err();
    assert!(err.detail().contains("\"ext\""), "got: {err}");
}

#[test]
fn dangling_reference_fails_load() {
    let err = ContractRegistry::load(vec![ContractSource::from_file(fixture("dangling.yaml"))]).unwrap_err();
    match err {
        ContractLoadError::DanglingReference { contract, reference, .. } => {
            assert_eq!(contract, "dangling");
            assert_eq!(reference, "#/components/schemas/Thing");
        }
        other => panic!("expected DanglingReference, got: {other}"),
    }
}

#[test]
fn unparsable_document_fails_load() {
    let err = ContractRegistry::load(vec![ContractSource::from_file(fixture("unparsable.yaml"))]).unwrap_err();
    assert!(matches!(err, ContractLoadError::Parse { .. }), "got: {err}");
}

#[test]
fn undeclared_path_variable_fails_load() {
    let err = ContractRegistry::load(vec![ContractSource::from_file(fixture("undeclared-path-param.json"))])
        .unwrap_err();
    assert!(err.to_string().contains("item_id"), "got: {err}");
}

#[test]
fn missing_file_fails_load() {
    let err = ContractRegistry::load(vec![ContractSource::from_file(fixture("absent.yaml"))]).unwrap_err();
    assert!(matches!(err, ContractLoadError::Source { .. }), "got: {err}");
}

#[test]
fn a_bad_contract_anywhere_fails_the_whole_load() {
    let err = ContractRegistry::load(vec![
        ContractSource::from_file(fixture("profiles.yaml")),
        ContractSource::from_file(fixture("dangling.yaml")),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("dangling"), "got: {err}");
}

#[test]
fn json_contract_from_temp_file_loads() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    let doc = json!({
        "openapi": "3.1.0",
        "info": {"title": "Temp", "version": "0.1.0"},
        "paths": {"/ping": {"get": {"operationId": "ping"}}}
    });
    file.write_all(doc.to_string().as_bytes()).unwrap();

    let registry = ContractRegistry::load(vec![ContractSource::from_file(file.path())]).unwrap();
    let route = registry.validators()[0].find_route(HttpMethod::Get, "/ping").unwrap();
    assert_eq!(route.operation_id, "ping");
}

proptest! {
    #[test]
    fn undeclared_top_level_paths_never_match(segment in "[a-z]{1,12}") {
        prop_assume!(segment != "profiles");
        let registry = profiles();
        let path = format!("/{segment}");
        for method in HttpMethod::ALL {
            prop_assert!(registry.validators()[0].find_route(method, &path).is_none());
        }
    }

    #[test]
    fn any_nonempty_id_binds_verbatim(id in "[A-Za-z0-9_-]{1,24}") {
        let registry = profiles();
        let route = registry.validators()[0]
            .find_route(HttpMethod::Get, &format!("/profiles/{id}"))
            .unwrap();
        prop_assert_eq!(route.path_params.get("id"), Some(&id));
    }
}
