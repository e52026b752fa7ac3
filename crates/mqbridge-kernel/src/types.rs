//! Core data types shared by route definitions, the resolver and the
//! template renderer.
//!
//! These types carry no runtime dependencies beyond `serde` and `std`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method a bridged route accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str_ci(&value).ok_or_else(|| format!("unsupported HTTP method '{value}'"))
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Broker delivery
// ─────────────────────────────────────────────────────────────────────────────

/// Broker quality-of-service level for a single published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce,
    /// Delivered at least once; duplicates are possible.
    AtLeastOnce,
    /// Delivered exactly once to the broker.
    ExactlyOnce,
}

impl QoS {
    pub fn as_u8(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QoS {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(format!("qos must be 0, 1 or 2 (got {other})")),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos.as_u8()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameter typing
// ─────────────────────────────────────────────────────────────────────────────

/// Semantic type of a route parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Boolean => "boolean",
        }
    }

    /// Whether `min`/`max` bounds apply to this type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamType::Integer | ParamType::Float)
    }

    /// Coerce a textual value (query string, path segment, or JSON string)
    /// into this type.
    ///
    /// Returns a human-readable reason on failure.
    pub fn coerce_text(&self, raw: &str) -> Result<ParamValue, String> {
        match self {
            ParamType::String => Ok(ParamValue::String(raw.to_string())),
            ParamType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(ParamValue::Int)
                .map_err(|_| format!("'{raw}' is not a whole number")),
            ParamType::Float => match raw.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(ParamValue::Float(f)),
                _ => Err(format!("'{raw}' is not a decimal number")),
            },
            ParamType::Boolean => parse_bool_literal(raw)
                .map(ParamValue::Bool)
                .ok_or_else(|| format!("'{raw}' is not a boolean literal")),
        }
    }

    /// Coerce a JSON value (request body field, configured default or enum
    /// entry) into this type.
    pub fn coerce_json(&self, raw: &serde_json::Value) -> Result<ParamValue, String> {
        use serde_json::Value;

        match raw {
            Value::String(s) => self.coerce_text(s),
            Value::Number(n) => match self {
                ParamType::String => Ok(ParamValue::String(n.to_string())),
                ParamType::Integer => {
                    if let Some(i) = n.as_i64() {
                        return Ok(ParamValue::Int(i));
                    }
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Ok(ParamValue::Int(f as i64))
                        }
                        _ => Err(format!("{n} is not a whole number in the 64-bit range")),
                    }
                }
                ParamType::Float => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(ParamValue::Float)
                    .ok_or_else(|| format!("{n} is not a finite decimal number")),
                ParamType::Boolean => match n.as_i64() {
                    Some(0) => Ok(ParamValue::Bool(false)),
                    Some(1) => Ok(ParamValue::Bool(true)),
                    _ => Err(format!("{n} is not a boolean literal")),
                },
            },
            Value::Bool(b) => match self {
                ParamType::String => Ok(ParamValue::String(b.to_string())),
                ParamType::Boolean => Ok(ParamValue::Bool(*b)),
                _ => Err(format!("{b} is not a number")),
            },
            Value::Null => Err("null is not a value".to_string()),
            Value::Array(_) | Value::Object(_) => Err("expected a scalar value".to_string()),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_bool_literal(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" | "t" => Some(true),
        "false" | "0" | "no" | "n" | "off" | "f" => Some(false),
        _ => None,
    }
}

/// Where a parameter is read from on the inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    #[default]
    Query,
    Path,
    Body,
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Query => "query",
            ParamLocation::Path => "path",
            ParamLocation::Body => "body",
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed values
// ─────────────────────────────────────────────────────────────────────────────

/// A coerced parameter value.
///
/// Serializes to the natural JSON scalar (`"text"`, `3`, `21.5`, `true`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    /// Numeric view of the value, used for range checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(v) => f.write_str(&format_float(*v)),
            ParamValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Render a float in its shortest round-tripping decimal form, keeping a
/// trailing `.0` on whole numbers so the value stays a float in JSON.
pub fn format_float(value: f64) -> String {
    serde_json::Number::from_f64(value)
        .map(|n| n.to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Per-request mapping from parameter name to coerced value.
///
/// Built by the resolver for a single request and dropped when the request
/// completes. Iteration order is by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterBinding {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, ParamValue)> for ParameterBinding {
    fn from_iter<T: IntoIterator<Item = (K, ParamValue)>>(iter: T) -> Self {
        let mut binding = ParameterBinding::new();
        for (k, v) in iter {
            binding.insert(k, v);
        }
        binding
    }
}

// =============================================================================
// Tests
// =============================================================================
