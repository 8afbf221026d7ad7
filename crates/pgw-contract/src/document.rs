//! # Contract Document Model
//!
//! Parses an OpenAPI 3.x document (already converted to JSON) into the
//! operation model the matcher and validator work from. Parsing is also the
//! structural self-validation step: anything the gateway could not enforce
//! faithfully at request time is rejected here, at startup.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use pgw_core::{ContractLoadError, HttpMethod};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::refs::{escape_token, resolve};

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Lowercase OpenAPI name of the location.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared parameter with its `$ref` already resolved.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// Parameter schema; `None` accepts any value.
    pub schema: Option<Value>,
    /// JSON Pointer of the parameter's schema, for error reporting.
    pub pointer: String,
}

/// One declared media type of a request body.
#[derive(Debug, Clone)]
pub struct MediaType {
    /// Lowercased media range, e.g. `application/json` or `image/*`.
    pub media_type: String,
    pub schema: Option<Value>,
    pub pointer: String,
}

/// A declared request body with its `$ref` already resolved.
#[derive(Debug, Clone)]
pub struct RequestBody {
    pub required: bool,
    pub content: Vec<MediaType>,
}

/// One alternative of a `security` list: every named scheme must pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    pub schemes: Vec<String>,
}

/// A declared security scheme, reduced to what a presence check needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityScheme {
    /// `type: http`; the scheme name (`bearer`, `basic`, ...) is lowercased.
    Http { scheme: String },
    /// `type: apiKey`.
    ApiKey { name: String, location: ParameterLocation },
    /// `type: oauth2` or `type: openIdConnect`; satisfied by a bearer token.
    OAuth,
}

/// One operation: a method on a path template.
#[derive(Debug, Clone)]
pub struct Operation {
    pub operation_id: String,
    pub method: HttpMethod,
    pub path_template: String,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub security: Vec<SecurityRequirement>,
}

/// A parsed, structurally valid contract.
#[derive(Debug, Clone)]
pub struct ContractDocument {
    pub name: String,
    pub title: String,
    pub version: String,
    /// Path prefixes declared by `servers`; empty when all servers are rooted at `/`.
    pub base_paths: Vec<String>,
    /// Operations in document order.
    pub operations: Vec<Operation>,
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

#[derive(Deserialize)]
struct RawParameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
    #[serde(default)]
    required: bool,
    schema: Option<Value>,
    content: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct RawRequestBody {
    #[serde(default)]
    required: bool,
    content: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOperation {
    operation_id: Option<String>,
    #[serde(default)]
    parameters: Vec<Value>,
    request_body: Option<Value>,
    security: Option<Vec<Map<String, Value>>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSecurityScheme {
    #[serde(rename = "type")]
    kind: String,
    scheme: Option<String>,
    name: Option<String>,
    #[serde(rename = "in")]
    location: Option<String>,
}

/// Parse and structurally validate a contract document.
///
/// `root` must already have passed [`check_references`](crate::refs::check_references).
pub fn parse(name: &str, root: &Value) -> Result<ContractDocument, ContractLoadError> {
    let Some(doc) = root.as_object() else {
        return Err(ContractLoadError::structure(name, "", "document must be a mapping"));
    };

    let openapi = match doc.get("openapi") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(ContractLoadError::structure(name, "/openapi", "missing 'openapi' version string")),
    };
    if !openapi.starts_with("3.") && openapi != "3" {
        return Err(ContractLoadError::structure(
            name,
            "/openapi",
            format!("unsupported OpenAPI version '{openapi}', expected 3.x"),
        ));
    }

    let info = doc
        .get("info")
        .and_then(Value::as_object)
        .ok_or_else(|| ContractLoadError::structure(name, "/info", "missing 'info' object"))?;
    let title = required_str(name, info, "/info", "title")?;
    let version = required_str(name, info, "/info", "version")?;

    let base_paths = parse_servers(name, doc.get("servers"))?;
    let security_schemes = parse_security_schemes(name, root)?;
    let global_security = match doc.get("security") {
        Some(value) => {
            let list: Vec<Map<String, Value>> = serde_json::from_value(value.clone())
                .map_err(|e| ContractLoadError::structure(name, "/security", e.to_string()))?;
            parse_security(name, "/security", &list, &security_schemes)?
        }
        None => Vec::new(),
    };

    let paths = doc
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| ContractLoadError::structure(name, "/paths", "missing 'paths' mapping"))?;

    let mut operations = Vec::new();
    let mut seen_ids = HashSet::new();
    for (path, item) in paths {
        let item_pointer = format!("/paths/{}", escape_token(path));
        if !path.starts_with('/') {
            return Err(ContractLoadError::structure(name, item_pointer, "path must start with '/'"));
        }
        let (item, item_pointer) = resolve(name, root, item, &item_pointer)?;
        let Some(item) = item.as_object() else {
            return Err(ContractLoadError::structure(name, item_pointer, "path item must be a mapping"));
        };
        let template_vars = template_variables(name, path, &item_pointer)?;
        let shared = parse_parameters(name, root, item.get("parameters"), &format!("{item_pointer}/parameters"))?;

        for method in HttpMethod::ALL {
            let Some(raw) = item.get(method.as_key()) else {
                continue;
            };
            let op_pointer = format!("{item_pointer}/{}", method.as_key());
            let raw_op: RawOperation = serde_json::from_value(raw.clone())
                .map_err(|e| ContractLoadError::structure(name, op_pointer.clone(), e.to_string()))?;

            let own = parse_parameters(
                name,
                root,
                Some(&Value::Array(raw_op.parameters.clone())),
                &format!("{op_pointer}/parameters"),
            )?;
            let parameters = merge_parameters(shared.clone(), own);
            check_path_parameters(name, &op_pointer, &template_vars, &parameters)?;

            let request_body = match &raw_op.request_body {
                Some(body) => Some(parse_request_body(name, root, body, &format!("{op_pointer}/requestBody"))?),
                None => None,
            };

            let security = match &raw_op.security {
                Some(list) => parse_security(name, &format!("{op_pointer}/security"), list, &security_schemes)?,
                None => global_security.clone(),
            };

            let operation_id = raw_op
                .operation_id
                .unwrap_or_else(|| format!("{} {path}", method.as_str()));
            if !seen_ids.insert(operation_id.clone()) {
                return Err(ContractLoadError::structure(
                    name,
                    format!("{op_pointer}/operationId"),
                    format!("duplicate operationId '{operation_id}'"),
                ));
            }

            operations.push(Operation {
                operation_id,
                method,
                path_template: path.clone(),
                parameters,
                request_body,
                security,
            });
        }
    }

    Ok(ContractDocument {
        name: name.to_string(),
        title,
        version,
        base_paths,
        operations,
        security_schemes,
    })
}

fn required_str(
    name: &str,
    map: &Map<String, Value>,
    pointer: &str,
    key: &str,
) -> Result<String, ContractLoadError> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ContractLoadError::structure(name, format!("{pointer}/{key}"), format!("missing '{key}' string")))
}

/// Extract non-root path prefixes from `servers[].url`.
fn parse_servers(name: &str, servers: Option<&Value>) -> Result<Vec<String>, ContractLoadError> {
    let Some(servers) = servers else {
        return Ok(Vec::new());
    };
    let servers = servers
        .as_array()
        .ok_or_else(|| ContractLoadError::structure(name, "/servers", "servers must be a list"))?;

    let mut prefixes = Vec::new();
    let mut rooted = false;
    for (i, server) in servers.iter().enumerate() {
        let raw = server
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ContractLoadError::structure(name, format!("/servers/{i}/url"), "missing server url"))?;
        let path = if raw.starts_with('/') {
            raw.to_string()
        } else {
            url::Url::parse(raw)
                .map(|u| u.path().to_string())
                .map_err(|e| ContractLoadError::structure(name, format!("/servers/{i}/url"), e.to_string()))?
        };
        let path = path.trim_end_matches('/').to_string();
        if path.is_empty() {
            rooted = true;
        } else if !prefixes.contains(&path) {
            prefixes.push(path);
        }
    }
    // A server rooted at `/` makes unprefixed paths valid too.
    if rooted && !prefixes.is_empty() {
        prefixes.push(String::new());
    }
    Ok(prefixes)
}

fn parse_security_schemes(
    name: &str,
    root: &Value,
) -> Result<BTreeMap<String, SecurityScheme>, ContractLoadError> {
    let mut schemes = BTreeMap::new();
    let Some(declared) = root.pointer("/components/securitySchemes").and_then(Value::as_object) else {
        return Ok(schemes);
    };
    for (scheme_name, value) in declared {
        let pointer = format!("/components/securitySchemes/{}", escape_token(scheme_name));
        let (value, pointer) = resolve(name, root, value, &pointer)?;
        let raw: RawSecurityScheme = serde_json::from_value(value.clone())
            .map_err(|e| ContractLoadError::structure(name, pointer.clone(), e.to_string()))?;
        let scheme = match raw.kind.as_str() {
            "http" => SecurityScheme::Http {
                scheme: raw
                    .scheme
                    .ok_or_else(|| ContractLoadError::structure(name, pointer.clone(), "http scheme needs 'scheme'"))?
                    .to_ascii_lowercase(),
            },
            "apiKey" => {
                let key_name = raw
                    .name
                    .ok_or_else(|| ContractLoadError::structure(name, pointer.clone(), "apiKey scheme needs 'name'"))?;
                let location = match raw.location.as_deref() {
                    Some("header") => ParameterLocation::Header,
                    Some("query") => ParameterLocation::Query,
                    Some("cookie") => ParameterLocation::Cookie,
                    other => {
                        return Err(ContractLoadError::structure(
                            name,
                            pointer,
                            format!("apiKey 'in' must be header, query or cookie, found {other:?}"),
                        ))
                    }
                };
                SecurityScheme::ApiKey { name: key_name, location }
            }
            "oauth2" | "openIdConnect" => SecurityScheme::OAuth,
            other => {
                return Err(ContractLoadError::structure(
                    name,
                    pointer,
                    format!("unsupported security scheme type '{other}'"),
                ))
            }
        };
        schemes.insert(scheme_name.clone(), scheme);
    }
    Ok(schemes)
}

fn parse_security(
    name: &str,
    pointer: &str,
    list: &[Map<String, Value>],
    schemes: &BTreeMap<String, SecurityScheme>,
) -> Result<Vec<SecurityRequirement>, ContractLoadError> {
    list.iter()
        .enumerate()
        .map(|(i, requirement)| {
            let names = requirement
                .keys()
                .map(|scheme| {
                    if schemes.contains_key(scheme) {
                        Ok(scheme.clone())
                    } else {
                        Err(ContractLoadError::structure(
                            name,
                            format!("{pointer}/{i}"),
                            format!("security requirement names undeclared scheme '{scheme}'"),
                        ))
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SecurityRequirement { schemes: names })
        })
        .collect()
}

fn parse_parameters(
    name: &str,
    root: &Value,
    list: Option<&Value>,
    pointer: &str,
) -> Result<Vec<Parameter>, ContractLoadError> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    let items = list
        .as_array()
        .ok_or_else(|| ContractLoadError::structure(name, pointer, "parameters must be a list"))?;

    let mut parameters = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let (item, at) = resolve(name, root, item, &format!("{pointer}/{i}"))?;
        let raw: RawParameter = serde_json::from_value(item.clone())
            .map_err(|e| ContractLoadError::structure(name, at.clone(), e.to_string()))?;
        let location = match raw.location.as_str() {
            "path" => ParameterLocation::Path,
            "query" => ParameterLocation::Query,
            "header" => ParameterLocation::Header,
            "cookie" => ParameterLocation::Cookie,
            other => {
                return Err(ContractLoadError::structure(
                    name,
                    format!("{at}/in"),
                    format!("unknown parameter location '{other}'"),
                ))
            }
        };
        // `content` is the alternative to `schema`; its single entry carries the schema.
        let (schema, schema_pointer) = match (raw.schema, raw.content) {
            (Some(schema), _) => (Some(schema), format!("{at}/schema")),
            (None, Some(content)) => match content.into_iter().next() {
                Some((media, entry)) => (
                    entry.get("schema").cloned(),
                    format!("{at}/content/{}/schema", escape_token(&media)),
                ),
                None => (None, at.clone()),
            },
            (None, None) => (None, at.clone()),
        };
        parameters.push(Parameter {
            required: raw.required || location == ParameterLocation::Path,
            name: raw.name,
            location,
            schema,
            pointer: schema_pointer,
        });
    }
    Ok(parameters)
}

/// Operation-level parameters override path-level ones with the same name and location.
fn merge_parameters(shared: Vec<Parameter>, own: Vec<Parameter>) -> Vec<Parameter> {
    let mut merged: Vec<Parameter> = shared
        .into_iter()
        .filter(|p| !own.iter().any(|o| o.name == p.name && o.location == p.location))
        .collect();
    merged.extend(own);
    merged
}

fn parse_request_body(
    name: &str,
    root: &Value,
    body: &Value,
    pointer: &str,
) -> Result<RequestBody, ContractLoadError> {
    let (body, at) = resolve(name, root, body, pointer)?;
    let raw: RawRequestBody = serde_json::from_value(body.clone())
        .map_err(|e| ContractLoadError::structure(name, at.clone(), e.to_string()))?;
    if raw.content.is_empty() {
        return Err(ContractLoadError::structure(
            name,
            format!("{at}/content"),
            "request body must declare at least one media type",
        ));
    }
    let content = raw
        .content
        .into_iter()
        .map(|(media_type, entry)| {
            let media_pointer = format!("{at}/content/{}", escape_token(&media_type));
            let (entry, _) = resolve(name, root, &entry, &media_pointer)?;
            Ok(MediaType {
                media_type: media_type.to_ascii_lowercase(),
                schema: entry.get("schema").cloned(),
                pointer: format!("{media_pointer}/schema"),
            })
        })
        .collect::<Result<Vec<_>, ContractLoadError>>()?;
    Ok(RequestBody {
        required: raw.required,
        content,
    })
}

/// Collect the `{name}` variables of a path template.
fn template_variables(name: &str, path: &str, pointer: &str) -> Result<Vec<String>, ContractLoadError> {
    let mut vars = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            return Err(ContractLoadError::structure(name, pointer, format!("unclosed template variable in '{path}'")));
        };
        let var = &rest[open + 1..open + close];
        if var.is_empty() || var.contains('/') {
            return Err(ContractLoadError::structure(name, pointer, format!("invalid template variable in '{path}'")));
        }
        vars.push(var.to_string());
        rest = &rest[open + close + 1..];
        if rest.starts_with('{') {
            return Err(ContractLoadError::structure(
                name,
                pointer,
                format!("adjacent template variables in '{path}' cannot be told apart"),
            ));
        }
    }
    Ok(vars)
}

/// Every template variable needs a path parameter and every path parameter
/// needs a template variable.
fn check_path_parameters(
    name: &str,
    pointer: &str,
    template_vars: &[String],
    parameters: &[Parameter],
) -> Result<(), ContractLoadError> {
    for var in template_vars {
        if !parameters
            .iter()
            .any(|p| p.location == ParameterLocation::Path && &p.name == var)
        {
            return Err(ContractLoadError::structure(
                name,
                pointer,
                format!("template variable '{var}' has no matching path parameter"),
            ));
        }
    }
    for param in parameters.iter().filter(|p| p.location == ParameterLocation::Path) {
        if !template_vars.contains(&param.name) {
            return Err(ContractLoadError::structure(
                name,
                pointer,
                format!("path parameter '{}' does not appear in the path template", param.name),
            ));
        }
    }
    Ok(())
}
