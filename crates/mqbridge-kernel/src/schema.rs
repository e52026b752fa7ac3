//! Parameter schemas.
//!
//! [`ParameterSchema`] is the configuration form of one input field, exactly
//! as it appears in the routes document. [`ParameterSchema::compile`] checks
//! the schema against itself and produces a [`ParameterSpec`] whose default
//! and enum entries are already coerced to the declared type, so request-time
//! checks never re-parse configuration values.

use crate::error::{ConfigError, ValidationError};
use crate::types::{format_float, ParamLocation, ParamType, ParamValue};
use serde::{Deserialize, Serialize};

fn default_required() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// ParameterSchema
// ─────────────────────────────────────────────────────────────────────────────

/// One declared input field of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Identifier, unique within the route.
    pub name: String,
    /// Semantic type the raw value is coerced to.
    #[serde(rename = "type")]
    pub ty: ParamType,
    /// Request location the value is read from.
    #[serde(default)]
    pub location: ParamLocation,
    /// Whether a request must supply the value.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Value used when an optional parameter is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Closed set of accepted values.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<serde_json::Value>>,
    /// Inclusive lower bound (numeric types only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound (numeric types only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ParameterSchema {
    /// Create a required query parameter of the given type.
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            location: ParamLocation::Query,
            required: true,
            default: None,
            allowed: None,
            min: None,
            max: None,
        }
    }

    /// Builder: read the value from `location`.
    pub fn at(mut self, location: ParamLocation) -> Self {
        self.location = location;
        self
    }

    /// Builder: make the parameter optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Builder: set the default (implies optional).
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    /// Builder: restrict to a closed set of values.
    pub fn with_enum(mut self, values: Vec<serde_json::Value>) -> Self {
        self.allowed = Some(values);
        self
    }

    /// Builder: set inclusive numeric bounds.
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Check the schema's internal consistency and coerce its configured
    /// values. `route` is the label used in error messages.
    ///
    /// Checks performed (in order):
    /// 1. The name is a non-empty identifier.
    /// 2. A default is only present on an optional parameter.
    /// 3. `min`/`max` only appear on numeric types, and `min <= max`.
    /// 4. The default coerces to the declared type and satisfies enum/bounds.
    /// 5. The enum is non-empty, every entry coerces, and every entry lies
    ///    within the declared bounds.
    pub fn compile(&self, route: &str) -> Result<ParameterSpec, ConfigError> {
        let err_ctx = || (route.to_string(), self.name.clone());

        if !is_identifier(&self.name) {
            let (route, parameter) = err_ctx();
            return Err(ConfigError::InvalidParameterName { route, parameter });
        }

        if self.default.is_some() && self.required {
            let (route, parameter) = err_ctx();
            return Err(ConfigError::DefaultOnRequired { route, parameter });
        }

        if self.min.is_some() || self.max.is_some() {
            if !self.ty.is_numeric() {
                let (route, parameter) = err_ctx();
                return Err(ConfigError::BoundsOnNonNumeric {
                    route,
                    parameter,
                    ty: self.ty,
                });
            }
            if let (Some(min), Some(max)) = (self.min, self.max) {
                if min > max {
                    let (route, parameter) = err_ctx();
                    return Err(ConfigError::InvalidBounds { route, parameter });
                }
            }
        }

        let allowed = match &self.allowed {
            None => None,
            Some(values) if values.is_empty() => {
                let (route, parameter) = err_ctx();
                return Err(ConfigError::EmptyEnum { route, parameter });
            }
            Some(values) => {
                let mut coerced = Vec::with_capacity(values.len());
                for raw in values {
                    let value = self.ty.coerce_json(raw).map_err(|reason| {
                        let (route, parameter) = err_ctx();
                        ConfigError::InvalidEnumValue {
                            route,
                            parameter,
                            reason,
                        }
                    })?;
                    if !within_bounds(&value, self.min, self.max) {
                        let (route, parameter) = err_ctx();
                        return Err(ConfigError::EnumOutOfBounds {
                            route,
                            parameter,
                            value: value.to_string(),
                        });
                    }
                    coerced.push(value);
                }
                Some(coerced)
            }
        };

        let mut spec = ParameterSpec {
            name: self.name.clone(),
            ty: self.ty,
            location: self.location,
            required: self.required,
            default: None,
            allowed,
            min: self.min,
            max: self.max,
        };

        if let Some(raw) = &self.default {
            let value = self
                .ty
                .coerce_json(raw)
                .and_then(|value| spec.check(value).map_err(|e| e.to_string()))
                .map_err(|reason| {
                    let (route, parameter) = err_ctx();
                    ConfigError::InvalidDefault {
                        route,
                        parameter,
                        reason,
                    }
                })?;
            spec.default = Some(value);
        }

        Ok(spec)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ParameterSpec
// ─────────────────────────────────────────────────────────────────────────────

/// A compiled, self-consistent parameter schema.
///
/// Only obtainable through [`ParameterSchema::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    name: String,
    ty: ParamType,
    location: ParamLocation,
    required: bool,
    default: Option<ParamValue>,
    allowed: Option<Vec<ParamValue>>,
    min: Option<f64>,
    max: Option<f64>,
}

impl ParameterSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> ParamType {
        self.ty
    }

    pub fn location(&self) -> ParamLocation {
        self.location
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&ParamValue> {
        self.default.as_ref()
    }

    /// Coerce a textual raw value and run the enum/range checks.
    pub fn accept_text(&self, raw: &str) -> Result<ParamValue, ValidationError> {
        let value = self
            .ty
            .coerce_text(raw)
            .map_err(|reason| self.type_mismatch(reason))?;
        self.check(value)
    }

    /// Coerce a JSON raw value and run the enum/range checks.
    pub fn accept_json(&self, raw: &serde_json::Value) -> Result<ParamValue, ValidationError> {
        let value = self
            .ty
            .coerce_json(raw)
            .map_err(|reason| self.type_mismatch(reason))?;
        self.check(value)
    }

    /// Enum membership first, then inclusive bounds.
    fn check(&self, value: ParamValue) -> Result<ParamValue, ValidationError> {
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&value) {
                return Err(ValidationError::InvalidEnum {
                    parameter: self.name.clone(),
                    allowed: allowed
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }

        if !within_bounds(&value, self.min, self.max) {
            return Err(ValidationError::OutOfRange {
                parameter: self.name.clone(),
                bounds: describe_bounds(self.min, self.max),
            });
        }

        Ok(value)
    }

    fn type_mismatch(&self, reason: String) -> ValidationError {
        ValidationError::TypeMismatch {
            parameter: self.name.clone(),
            expected: self.ty,
            reason,
        }
    }
}

fn within_bounds(value: &ParamValue, min: Option<f64>, max: Option<f64>) -> bool {
    let Some(v) = value.as_f64() else {
        return true;
    };
    min.is_none_or(|min| v >= min) && max.is_none_or(|max| v <= max)
}

fn describe_bounds(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => {
            format!("between {} and {} inclusive", format_float(min), format_float(max))
        }
        (Some(min), None) => format!(">= {}", format_float(min)),
        (None, Some(max)) => format!("<= {}", format_float(max)),
        (None, None) => "unbounded".to_string(),
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ROUTE: &str = "POST /test";

    // ── Compile-time checks ───────────────────────────────────────────────────

    #[test]
    fn plain_schema_compiles() {
        let spec = ParameterSchema::new("room", ParamType::String)
            .compile(ROUTE)
            .unwrap();
        assert_eq!(spec.name(), "room");
        assert!(spec.required());
        assert_eq!(spec.location(), ParamLocation::Query);
    }

    #[test]
    fn invalid_name_is_rejected() {
        for name in ["", "1abc", "has space", "dash-ed"] {
            let err = ParameterSchema::new(name, ParamType::String)
                .compile(ROUTE)
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidParameterName { .. }), "{name}");
        }
    }

    #[test]
    fn default_on_required_is_rejected() {
        let mut schema = ParameterSchema::new("unit", ParamType::String);
        schema.default = Some(json!("celsius"));
        assert_eq!(
            schema.compile(ROUTE),
            Err(ConfigError::DefaultOnRequired {
                route: ROUTE.to_string(),
                parameter: "unit".to_string(),
            })
        );
    }

    #[test]
    fn default_is_coerced_to_declared_type() {
        let spec = ParameterSchema::new("level", ParamType::Integer)
            .with_default(json!("5"))
            .compile(ROUTE)
            .unwrap();
        assert_eq!(spec.default_value(), Some(&ParamValue::Int(5)));
    }

    #[test]
    fn default_of_wrong_type_is_rejected() {
        let err = ParameterSchema::new("level", ParamType::Integer)
            .with_default(json!("high"))
            .compile(ROUTE)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDefault { .. }));
    }

    #[test]
    fn default_outside_bounds_is_rejected() {
        let err = ParameterSchema::new("level", ParamType::Integer)
            .with_range(Some(0.0), Some(10.0))
            .with_default(json!(11))
            .compile(ROUTE)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDefault { .. }));
    }

    #[test]
    fn bounds_on_string_are_rejected() {
        let err = ParameterSchema::new("room", ParamType::String)
            .with_range(Some(1.0), None)
            .compile(ROUTE)
            .unwrap_err();
        assert!(matches!(err, ConfigError::BoundsOnNonNumeric { .. }));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = ParameterSchema::new("target", ParamType::Float)
            .with_range(Some(30.0), Some(10.0))
            .compile(ROUTE)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBounds { .. }));
    }

    #[test]
    fn empty_enum_is_rejected() {
        let err = ParameterSchema::new("state", ParamType::String)
            .with_enum(vec![])
            .compile(ROUTE)
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyEnum { .. }));
    }

    #[test]
    fn enum_entry_of_wrong_type_is_rejected() {
        let err = ParameterSchema::new("speed", ParamType::Integer)
            .with_enum(vec![json!(1), json!("fast")])
            .compile(ROUTE)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnumValue { .. }));
    }

    #[test]
    fn enum_entry_outside_bounds_is_rejected() {
        let err = ParameterSchema::new("speed", ParamType::Integer)
            .with_enum(vec![json!(1), json!(5)])
            .with_range(Some(0.0), Some(3.0))
            .compile(ROUTE)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::EnumOutOfBounds {
                route: ROUTE.to_string(),
                parameter: "speed".to_string(),
                value: "5".to_string(),
            }
        );
    }

    // ── Request-time checks ───────────────────────────────────────────────────

    #[test]
    fn enum_membership_is_enforced() {
        let spec = ParameterSchema::new("state", ParamType::String)
            .with_enum(vec![json!("on"), json!("off")])
            .compile(ROUTE)
            .unwrap();
        assert_eq!(spec.accept_text("on"), Ok(ParamValue::String("on".into())));
        let err = spec.accept_json(&json!("maybe")).unwrap_err();
        assert_eq!(err.kind(), "InvalidEnum");
        assert_eq!(err.parameter(), Some("state"));
    }

    #[test]
    fn bounds_are_inclusive() {
        let spec = ParameterSchema::new("target", ParamType::Integer)
            .with_range(Some(10.0), Some(30.0))
            .compile(ROUTE)
            .unwrap();
        assert_eq!(spec.accept_text("10"), Ok(ParamValue::Int(10)));
        assert_eq!(spec.accept_text("30"), Ok(ParamValue::Int(30)));
        assert_eq!(spec.accept_text("9").unwrap_err().kind(), "OutOfRange");
        assert_eq!(spec.accept_text("31").unwrap_err().kind(), "OutOfRange");
    }

    #[test]
    fn type_mismatch_names_the_parameter() {
        let spec = ParameterSchema::new("target", ParamType::Float)
            .compile(ROUTE)
            .unwrap();
        let err = spec.accept_text("warm").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::TypeMismatch { ref parameter, expected: ParamType::Float, .. }
                if parameter == "target"
        ));
    }

    #[test]
    fn schema_deserializes_with_defaults() {
        let schema: ParameterSchema = serde_yaml::from_str(
            r#"
name: state
type: string
enum: ["on", "off"]
"#,
        )
        .unwrap();
        assert_eq!(schema.location, ParamLocation::Query);
        assert!(schema.required);
        assert_eq!(schema.allowed, Some(vec![json!("on"), json!("off")]));
    }
}
