//! # Contract Sources
//!
//! A [`ContractSource`] is a named loader that produces one contract
//! document as a JSON value. Sources are invoked exactly once, in
//! registration order, by [`ContractRegistry::load`](crate::ContractRegistry::load).
//!
//! YAML documents are converted to JSON before anything else looks at them.
//! Mapping order is preserved through the conversion because route
//! precedence depends on the order paths are declared in.

use std::fmt;
use std::path::{Path, PathBuf};

use pgw_core::ContractLoadError;
use serde_json::Value;

type Loader = Box<dyn Fn(&str) -> Result<Value, ContractLoadError> + Send + Sync>;

/// Text format of an inline contract document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension; anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// A named function that produces one contract document.
pub struct ContractSource {
    name: String,
    loader: Loader,
}

impl fmt::Debug for ContractSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractSource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ContractSource {
    /// Wrap an arbitrary loader. The loader receives the source name so it
    /// can attribute its own errors.
    pub fn from_fn<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn(&str) -> Result<Value, ContractLoadError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
        }
    }

    /// Load a YAML or JSON document from disk. The format follows the file
    /// extension. The source is named after the file stem.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path: PathBuf = path.as_ref().to_path_buf();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("contract")
            .to_string();
        Self::from_fn(name, move |name| {
            let text = std::fs::read_to_string(&path).map_err(|e| ContractLoadError::Source {
                contract: name.to_string(),
                reason: format!("cannot read {}: {e}", path.display()),
            })?;
            parse_document(name, &text, DocumentFormat::from_path(&path))
        })
    }

    /// Use an inline document, typically embedded with `include_str!`.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>, format: DocumentFormat) -> Self {
        let text = text.into();
        Self::from_fn(name, move |name| parse_document(name, &text, format))
    }

    /// Use an already parsed document.
    pub fn from_value(name: impl Into<String>, value: Value) -> Self {
        Self::from_fn(name, move |_| Ok(value.clone()))
    }

    /// Source name, used in logs and load errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the loader.
    pub fn load(&self) -> Result<Value, ContractLoadError> {
        (self.loader)(&self.name)
    }
}

/// Parse document text in the given format into a JSON value.
pub fn parse_document(name: &str, text: &str, format: DocumentFormat) -> Result<Value, ContractLoadError> {
    match format {
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| ContractLoadError::Parse {
            contract: name.to_string(),
            reason: format!("invalid JSON: {e}"),
        }),
        DocumentFormat::Yaml => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|e| ContractLoadError::Parse {
                    contract: name.to_string(),
                    reason: format!("invalid YAML: {e}"),
                })?;
            yaml_to_json_value(&yaml).map_err(|reason| ContractLoadError::Parse {
                contract: name.to_string(),
                reason: format!("YAML-to-JSON conversion failed: {reason}"),
            })
        }
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Contracts only use the JSON-compatible subset of YAML. Numeric and
/// boolean mapping keys (`200:` under `responses`) become strings; tags are
/// dropped.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
