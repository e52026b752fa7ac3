//! Parameter resolution.
//!
//! Turns the raw inputs of one request (query pairs, path captures, parsed
//! JSON body) into a typed [`ParameterBinding`], checking each compiled
//! [`ParameterSpec`] in declaration order. The first failure is returned.

use mqbridge_kernel::{ParamLocation, ParameterBinding, ParameterSpec, ValidationError};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Raw, unvalidated inputs of one request.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    query: Vec<(String, String)>,
    path_params: HashMap<String, String>,
    body: Option<Map<String, Value>>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a decoded query pair.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Builder: set a decoded path capture.
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Builder: set the parsed body object.
    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn set_query(&mut self, pairs: Vec<(String, String)>) {
        self.query = pairs;
    }

    pub fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    /// First value of a repeated query key wins.
    fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// A JSON `null` counts as absent.
    fn body_value(&self, name: &str) -> Option<&Value> {
        self.body
            .as_ref()
            .and_then(|b| b.get(name))
            .filter(|v| !v.is_null())
    }
}

/// Parse a request body for routes that declare body parameters.
///
/// An empty (or all-whitespace) body carries no fields. Anything else must
/// be a JSON object.
pub fn parse_body(bytes: &[u8]) -> Result<Option<Map<String, Value>>, ValidationError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(ValidationError::MalformedBody(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ValidationError::MalformedBody(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Resolve every parameter of a route against the raw request.
pub fn resolve(
    specs: &[ParameterSpec],
    raw: &RawRequest,
) -> Result<ParameterBinding, ValidationError> {
    let mut binding = ParameterBinding::new();

    for spec in specs {
        let value = match spec.location() {
            ParamLocation::Query => raw.query_value(spec.name()).map(|v| spec.accept_text(v)),
            ParamLocation::Path => raw
                .path_params
                .get(spec.name())
                .map(|v| spec.accept_text(v)),
            ParamLocation::Body => raw.body_value(spec.name()).map(|v| spec.accept_json(v)),
        };

        match value {
            Some(value) => binding.insert(spec.name(), value?),
            None if spec.required() => {
                return Err(ValidationError::MissingParameter {
                    parameter: spec.name().to_string(),
                });
            }
            None => {
                if let Some(default) = spec.default_value() {
                    binding.insert(spec.name(), default.clone());
                }
            }
        }
    }

    Ok(binding)
}

// =============================================================================
// Tests
// =============================================================================
