//! # Request Schema Validation
//!
//! Validation of a matched request against its operation's declared
//! parameters, request body and security requirements, using compiled
//! JSON Schema validators (Draft 2020-12, formats enforced).
//!
//! ## Compilation
//!
//! Every parameter and body schema is compiled once, at load time. Each
//! schema is wrapped together with the contract's `components` so that
//! `#/components/schemas/...` references resolve exactly as they do in the
//! document. Schemas that fail to compile are a load error.
//!
//! ## Check Order
//!
//! Security, then parameters in declaration order, then the body. The first
//! violation is returned; violations are never aggregated.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use jsonschema::{Draft, Retrieve, Uri, Validator};
use pgw_core::{ContractLoadError, RequestDescriptor, RouteMatch, ValidationFailure};
use serde_json::{json, Value};

use crate::document::{ContractDocument, Operation, Parameter, ParameterLocation, SecurityRequirement, SecurityScheme};
use crate::refs::resolve;
use crate::security::check_security;

/// Maximum nesting followed when deriving coercion shapes from a schema.
const MAX_SHAPE_DEPTH: usize = 8;

/// Refuses every external reference. Contracts are self-contained, so a
/// validator must never reach the network or the filesystem.
struct LocalOnlyRetriever;

impl Retrieve for LocalOnlyRetriever {
    fn retrieve(&self, uri: &Uri<&str>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Err(format!("external schema reference '{}' is not allowed", uri.as_str()).into())
    }
}

/// The JSON type a raw string value is coerced to before validation.
#[derive(Debug, Clone, PartialEq)]
enum ValueShape {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<ValueShape>),
    Object(BTreeMap<String, ValueShape>),
    Any,
}

impl ValueShape {
    fn of(root: &Value, schema: &Value, depth: usize) -> Self {
        if depth > MAX_SHAPE_DEPTH {
            return Self::Any;
        }
        let Ok((schema, _)) = resolve("", root, schema, "") else {
            return Self::Any;
        };
        let ty = match schema.get("type") {
            Some(Value::String(t)) => Some(t.as_str()),
            Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
            _ => None,
        };
        match ty {
            Some("string") => Self::String,
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("boolean") => Self::Boolean,
            Some("array") => Self::Array(Box::new(
                schema
                    .get("items")
                    .map_or(Self::Any, |items| Self::of(root, items, depth + 1)),
            )),
            Some("object") => Self::Object(
                schema
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(k, v)| (k.clone(), Self::of(root, v, depth + 1)))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            _ => Self::Any,
        }
    }

    /// Coerce the raw values of one parameter or form field.
    fn coerce(&self, raw: &[&str]) -> Result<Value, String> {
        match self {
            Self::Array(items) => {
                let parts: Vec<&str> = match raw {
                    [single] => single.split(',').collect(),
                    many => many.to_vec(),
                };
                parts
                    .into_iter()
                    .map(|part| items.coerce_scalar(part))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            scalar => scalar.coerce_scalar(raw.first().copied().unwrap_or("")),
        }
    }

    fn coerce_scalar(&self, raw: &str) -> Result<Value, String> {
        match self {
            Self::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("value \"{raw}\" is not a valid integer")),
            Self::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("value \"{raw}\" is not a valid number")),
            Self::Boolean => match raw {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!("value \"{raw}\" is not a valid boolean")),
            },
            Self::Object(_) => Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))),
            Self::String | Self::Array(_) | Self::Any => Ok(Value::String(raw.to_string())),
        }
    }
}

/// A compiled schema plus the coercion shape derived from it.
struct CompiledSchema {
    validator: Validator,
    shape: ValueShape,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    fn compile(
        contract: &str,
        root: &Value,
        components: &Value,
        schema: &Value,
        pointer: &str,
    ) -> Result<Self, ContractLoadError> {
        let wrapper = json!({ "components": components, "allOf": [schema] });
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .should_validate_formats(true)
            .with_retriever(LocalOnlyRetriever)
            .build(&wrapper)
            .map_err(|e| ContractLoadError::SchemaCompile {
                contract: contract.to_string(),
                pointer: pointer.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            validator,
            shape: ValueShape::of(root, schema, 0),
        })
    }

    /// First violation, formatted as `<instance path>: <message>`.
    fn first_violation(&self, instance: &Value) -> Option<String> {
        self.validator.iter_errors(instance).next().map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{path}: {e}")
            }
        })
    }
}

#[derive(Debug)]
struct CompiledParameter {
    name: String,
    location: ParameterLocation,
    required: bool,
    schema: Option<CompiledSchema>,
}

impl CompiledParameter {
    fn label(&self) -> String {
        format!("parameter \"{}\" in {}", self.name, self.location)
    }
}

#[derive(Debug)]
struct CompiledMediaType {
    media_type: String,
    schema: Option<CompiledSchema>,
}

#[derive(Debug)]
struct CompiledBody {
    required: bool,
    content: Vec<CompiledMediaType>,
}

impl CompiledBody {
    /// The declared entry for a request media type: exact match first, then
    /// `type/*`, then `*/*`.
    fn entry_for(&self, media_type: &str) -> Option<&CompiledMediaType> {
        let major = media_type.split('/').next().unwrap_or("");
        let range = format!("{major}/*");
        self.content
            .iter()
            .find(|c| c.media_type == media_type)
            .or_else(|| self.content.iter().find(|c| c.media_type == range))
            .or_else(|| self.content.iter().find(|c| c.media_type == "*/*"))
    }
}

#[derive(Debug)]
struct CompiledOperation {
    parameters: Vec<CompiledParameter>,
    body: Option<CompiledBody>,
    security: Vec<SecurityRequirement>,
}

/// Per-contract request validator holding one compiled entry per operation.
#[derive(Debug)]
pub struct SchemaValidator {
    operations: HashMap<String, CompiledOperation>,
    security_schemes: BTreeMap<String, SecurityScheme>,
}

impl SchemaValidator {
    /// Compile every schema the document's operations reference.
    ///
    /// `root` is the normalized document the operations were parsed from.
    pub fn new(document: &ContractDocument, root: &Value) -> Result<Self, ContractLoadError> {
        let components = root.get("components").cloned().unwrap_or_else(|| json!({}));
        let mut operations = HashMap::with_capacity(document.operations.len());
        for op in &document.operations {
            operations.insert(
                op.operation_id.clone(),
                compile_operation(&document.name, root, &components, op)?,
            );
        }
        Ok(Self {
            operations,
            security_schemes: document.security_schemes.clone(),
        })
    }

    /// Validate a request against the operation `route` matched.
    pub fn validate(&self, route: &RouteMatch, request: &RequestDescriptor) -> Result<(), ValidationFailure> {
        let Some(op) = self.operations.get(&route.operation_id) else {
            return Err(ValidationFailure::schema(format!(
                "operation '{}' is not declared by this contract",
                route.operation_id
            )));
        };

        check_security(&op.security, &self.security_schemes, request)?;

        for param in &op.parameters {
            check_parameter(param, route, request)?;
        }

        if let Some(body) = &op.body {
            check_body(body, request)?;
        }
        Ok(())
    }
}

fn compile_operation(
    contract: &str,
    root: &Value,
    components: &Value,
    op: &Operation,
) -> Result<CompiledOperation, ContractLoadError> {
    let parameters = op
        .parameters
        .iter()
        .map(|p: &Parameter| {
            Ok(CompiledParameter {
                name: p.name.clone(),
                location: p.location,
                required: p.required,
                schema: p
                    .schema
                    .as_ref()
                    .map(|s| CompiledSchema::compile(contract, root, components, s, &p.pointer))
                    .transpose()?,
            })
        })
        .collect::<Result<Vec<_>, ContractLoadError>>()?;

    let body = match &op.request_body {
        Some(body) => Some(CompiledBody {
            required: body.required,
            content: body
                .content
                .iter()
                .map(|m| {
                    Ok(CompiledMediaType {
                        media_type: m.media_type.clone(),
                        schema: m
                            .schema
                            .as_ref()
                            .map(|s| CompiledSchema::compile(contract, root, components, s, &m.pointer))
                            .transpose()?,
                    })
                })
                .collect::<Result<Vec<_>, ContractLoadError>>()?,
        }),
        None => None,
    };

    Ok(CompiledOperation {
        parameters,
        body,
        security: op.security.clone(),
    })
}

fn check_parameter(
    param: &CompiledParameter,
    route: &RouteMatch,
    request: &RequestDescriptor,
) -> Result<(), ValidationFailure> {
    let raw: Vec<&str> = match param.location {
        ParameterLocation::Path => route.path_params.get(&param.name).map(String::as_str).into_iter().collect(),
        ParameterLocation::Query => request.query_values(&param.name),
        ParameterLocation::Header => request.header(&param.name).into_iter().collect(),
        ParameterLocation::Cookie => request.cookie(&param.name).into_iter().collect(),
    };

    if raw.is_empty() {
        return if param.required {
            Err(ValidationFailure::schema(format!("{} is required", param.label())))
        } else {
            Ok(())
        };
    }

    let Some(schema) = &param.schema else {
        return Ok(());
    };
    let value = schema
        .shape
        .coerce(&raw)
        .map_err(|reason| ValidationFailure::schema(format!("{}: {reason}", param.label())))?;
    match schema.first_violation(&value) {
        Some(violation) => Err(ValidationFailure::schema(format!("{}: {violation}", param.label()))),
        None => Ok(()),
    }
}

fn check_body(body: &CompiledBody, request: &RequestDescriptor) -> Result<(), ValidationFailure> {
    if request.body().is_empty() {
        return if body.required {
            Err(ValidationFailure::schema("request body is required"))
        } else {
            Ok(())
        };
    }

    let Some(media_type) = request.media_type() else {
        return Err(ValidationFailure::schema("request body has no content type"));
    };
    let Some(entry) = body.entry_for(&media_type) else {
        return Err(ValidationFailure::schema(format!(
            "content type \"{media_type}\" is not declared for this operation"
        )));
    };
    let Some(schema) = &entry.schema else {
        return Ok(());
    };

    let instance = if is_json(&media_type) {
        serde_json::from_slice::<Value>(request.body())
            .map_err(|e| ValidationFailure::schema(format!("request body is not valid JSON: {e}")))?
    } else if media_type == "application/x-www-form-urlencoded" {
        decode_form(&schema.shape, request.body())
            .map_err(|reason| ValidationFailure::schema(format!("request body: {reason}")))?
    } else {
        // Opaque media types carry no structure to check.
        return Ok(());
    };

    match schema.first_violation(&instance) {
        Some(violation) => Err(ValidationFailure::schema(format!("request body: {violation}"))),
        None => Ok(()),
    }
}

fn is_json(media_type: &str) -> bool {
    media_type == "application/json" || media_type.ends_with("+json")
}

/// Decode a form body into an object, coercing fields per the body schema.
fn decode_form(shape: &ValueShape, body: &[u8]) -> Result<Value, String> {
    let mut fields: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        match fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => fields.push((key.into_owned(), vec![value.into_owned()])),
        }
    }
    let properties = match shape {
        ValueShape::Object(props) => Some(props),
        _ => None,
    };
    let mut object = serde_json::Map::new();
    for (key, values) in fields {
        let field_shape = properties
            .and_then(|props| props.get(&key))
            .unwrap_or(&ValueShape::String);
        let raw: Vec<&str> = values.iter().map(String::as_str).collect();
        let value = field_shape.coerce(&raw).map_err(|reason| format!("field \"{key}\": {reason}"))?;
        object.insert(key, value);
    }
    Ok(Value::Object(object))
}
