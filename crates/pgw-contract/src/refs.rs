//! # Reference Resolution and Schema Normalization
//!
//! Only document-local references (`#/components/...`) are supported. Every
//! `$ref` in a contract is checked once at load time, so a contract that
//! loads successfully has no dangling references.

use percent_encoding::percent_decode_str;
use pgw_core::ContractLoadError;
use serde_json::{Map, Value};

/// Maximum `$ref` hops followed before a chain is treated as cyclic.
const MAX_REF_DEPTH: usize = 32;

/// Escape a single JSON Pointer token (`~` → `~0`, `/` → `~1`).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Convert a local reference (`#/components/schemas/X`) to a JSON Pointer.
/// Returns `None` for anything that is not a local fragment.
fn local_pointer(reference: &str) -> Option<String> {
    let fragment = reference.strip_prefix('#')?;
    if !fragment.is_empty() && !fragment.starts_with('/') {
        return None;
    }
    Some(percent_decode_str(fragment).decode_utf8_lossy().into_owned())
}

/// Walk the whole document and reject any `$ref` that is non-local or
/// does not resolve.
pub fn check_references(contract: &str, root: &Value) -> Result<(), ContractLoadError> {
    check_node(contract, root, root, String::new())
}

fn check_node(contract: &str, root: &Value, node: &Value, pointer: String) -> Result<(), ContractLoadError> {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref") {
                let Some(reference) = reference.as_str() else {
                    return Err(ContractLoadError::structure(
                        contract,
                        format!("{pointer}/$ref"),
                        "$ref must be a string",
                    ));
                };
                let target = local_pointer(reference).ok_or_else(|| {
                    ContractLoadError::structure(
                        contract,
                        format!("{pointer}/$ref"),
                        format!("only document-local references are supported, found '{reference}'"),
                    )
                })?;
                if root.pointer(&target).is_none() {
                    return Err(ContractLoadError::DanglingReference {
                        contract: contract.to_string(),
                        pointer: pointer.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
            for (key, child) in map {
                check_node(contract, root, child, format!("{pointer}/{}", escape_token(key)))?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                check_node(contract, root, child, format!("{pointer}/{i}"))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Follow `$ref` hops until a node without `$ref` is reached.
///
/// Returns the resolved node and the JSON Pointer it lives at. References
/// were checked at load, so failure here only means a cycle.
pub fn resolve<'a>(
    contract: &str,
    root: &'a Value,
    node: &'a Value,
    pointer: &str,
) -> Result<(&'a Value, String), ContractLoadError> {
    let mut current = node;
    let mut at = pointer.to_string();
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return Ok((current, at));
        };
        let target = local_pointer(reference).unwrap_or_default();
        current = root.pointer(&target).ok_or_else(|| ContractLoadError::DanglingReference {
            contract: contract.to_string(),
            pointer: at.clone(),
            reference: reference.to_string(),
        })?;
        at = target;
    }
    Err(ContractLoadError::structure(
        contract,
        pointer,
        format!("reference chain exceeds {MAX_REF_DEPTH} hops"),
    ))
}

/// Rewrite OpenAPI 3.0 schema dialect into plain JSON Schema, in place.
///
/// - `nullable: true` adds `"null"` to `type` (and to `enum` when present).
/// - Boolean `exclusiveMinimum`/`exclusiveMaximum` become numeric bounds.
pub fn normalize_schemas(node: &mut Value) {
    match node {
        Value::Object(map) => {
            normalize_nullable(map);
            normalize_exclusive(map, "minimum", "exclusiveMinimum");
            normalize_exclusive(map, "maximum", "exclusiveMaximum");
            for child in map.values_mut() {
                normalize_schemas(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_schemas),
        _ => {}
    }
}

fn normalize_nullable(map: &mut Map<String, Value>) {
    if map.get("nullable").and_then(Value::as_bool) != Some(true) {
        return;
    }
    map.remove("nullable");
    let widened = match map.get("type") {
        Some(Value::String(ty)) => Some(vec![Value::String(ty.clone()), Value::from("null")]),
        Some(Value::Array(types)) if !types.iter().any(|t| t == "null") => {
            let mut types = types.clone();
            types.push(Value::from("null"));
            Some(types)
        }
        _ => None,
    };
    if let Some(types) = widened {
        map.insert("type".into(), Value::Array(types));
    }
    if let Some(Value::Array(values)) = map.get_mut("enum") {
        if !values.iter().any(Value::is_null) {
            values.push(Value::Null);
        }
    }
}

fn normalize_exclusive(map: &mut Map<String, Value>, bound: &str, exclusive: &str) {
    let Some(flag) = map.get(exclusive).and_then(Value::as_bool) else {
        return;
    };
    map.remove(exclusive);
    if flag {
        if let Some(limit) = map.remove(bound) {
            map.insert(exclusive.to_string(), limit);
        }
    }
}
