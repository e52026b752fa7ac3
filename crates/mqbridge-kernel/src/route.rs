//! Route definitions.
//!
//! A [`RouteDefinition`] binds one HTTP endpoint to one broker topic and
//! payload template. Definitions are built once when configuration loads
//! and are immutable afterwards; a reload replaces the whole set.
//!
//! Path templates use the `{param}` segment syntax:
//! ```text
//! /set_temperature                 -> exact path
//! /device/{device_id}/control      -> captures `device_id`
//! /room/{room}/device/{device}     -> captures `room` and `device`
//! ```

use crate::error::ConfigError;
use crate::schema::{is_identifier, ParameterSchema, ParameterSpec};
use crate::types::{HttpMethod, ParamLocation, QoS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ─────────────────────────────────────────────────────────────────────────────
// Path templates
// ─────────────────────────────────────────────────────────────────────────────

/// One `/`-separated segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(String),
    Capture(String),
}

/// Split a path template into segments.
///
/// A placeholder must occupy a whole segment (`/a/{id}`, not `/a/x{id}`)
/// and name an identifier. Empty segments (`//`, trailing `/`) are dropped.
pub fn parse_path_template(path: &str) -> Result<Vec<PathSegment>, String> {
    if !path.starts_with('/') {
        return Err("path must start with '/'".to_string());
    }

    let mut segments = Vec::new();
    let mut seen = HashSet::new();
    for raw in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if !is_identifier(inner) {
                return Err(format!("placeholder '{raw}' is not a valid identifier"));
            }
            if !seen.insert(inner) {
                return Err(format!("placeholder '{raw}' appears more than once"));
            }
            segments.push(PathSegment::Capture(inner.to_string()));
        } else if raw.contains('{') || raw.contains('}') {
            return Err(format!("placeholder in segment '{raw}' must span the whole segment"));
        } else {
            segments.push(PathSegment::Literal(raw.to_string()));
        }
    }
    Ok(segments)
}

/// Canonical form of a path template with capture names erased, so
/// `/a/{x}` and `/a/{y}` normalize to the same pattern `/a/{}`.
pub fn normalize_pattern(segments: &[PathSegment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    segments
        .iter()
        .map(|s| match s {
            PathSegment::Literal(l) => format!("/{l}"),
            PathSegment::Capture(_) => "/{}".to_string(),
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// RouteDefinition
// ─────────────────────────────────────────────────────────────────────────────

/// Declarative description of one webhook-to-broker route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// URL path template, relative to the api_version prefix. Must begin with `/`.
    pub path: String,
    /// Accepted HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Broker topic with `{name}` placeholders.
    #[serde(alias = "mqtt_topic")]
    pub topic_template: String,
    /// Payload template rendered with the expression engine.
    pub payload_template: String,
    /// Declared inputs, in resolution order.
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,
    /// Broker QoS level, 0–2.
    #[serde(default)]
    pub qos: u8,
    /// Broker retain flag.
    #[serde(default)]
    pub retain: bool,
}

impl RouteDefinition {
    /// Create a POST route with no parameters, QoS 0 and no retain.
    pub fn new(
        path: impl Into<String>,
        topic_template: impl Into<String>,
        payload_template: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            method: HttpMethod::Post,
            topic_template: topic_template.into(),
            payload_template: payload_template.into(),
            parameters: Vec::new(),
            qos: 0,
            retain: false,
        }
    }

    /// Builder: set the HTTP method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Builder: append a parameter.
    pub fn with_parameter(mut self, parameter: ParameterSchema) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Builder: set QoS and retain.
    pub fn with_delivery(mut self, qos: u8, retain: bool) -> Self {
        self.qos = qos;
        self.retain = retain;
        self
    }

    /// Human-readable label used in logs and errors, e.g. `POST /set_temperature`.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Validated delivery QoS.
    pub fn qos(&self) -> Result<QoS, ConfigError> {
        QoS::try_from(self.qos).map_err(|_| ConfigError::InvalidQos {
            route: self.label(),
            qos: self.qos,
        })
    }

    /// Parsed path template.
    pub fn path_segments(&self) -> Result<Vec<PathSegment>, ConfigError> {
        parse_path_template(&self.path).map_err(|reason| ConfigError::InvalidPath {
            route: self.label(),
            reason,
        })
    }

    /// Check every route-level invariant and compile the parameter list.
    ///
    /// Checks performed (in order):
    /// 1. The path template parses.
    /// 2. QoS is 0, 1 or 2.
    /// 3. Each parameter passes [`ParameterSchema::compile`].
    /// 4. No two parameters share a name.
    /// 5. Every path-located parameter appears as a path placeholder.
    /// 6. Every path placeholder has a path-located parameter.
    pub fn compile_parameters(&self) -> Result<Vec<ParameterSpec>, ConfigError> {
        let label = self.label();
        let segments = self.path_segments()?;
        self.qos()?;

        let captures: HashSet<&str> = segments
            .iter()
            .filter_map(|s| match s {
                PathSegment::Capture(name) => Some(name.as_str()),
                PathSegment::Literal(_) => None,
            })
            .collect();

        let mut names = HashSet::new();
        let mut specs = Vec::with_capacity(self.parameters.len());
        for schema in &self.parameters {
            let spec = schema.compile(&label)?;
            if !names.insert(schema.name.as_str()) {
                return Err(ConfigError::DuplicateParameter {
                    route: label,
                    parameter: schema.name.clone(),
                });
            }
            if schema.location == ParamLocation::Path && !captures.contains(schema.name.as_str())
            {
                return Err(ConfigError::PathParameterNotInPath {
                    route: label,
                    parameter: schema.name.clone(),
                });
            }
            specs.push(spec);
        }

        for segment in &segments {
            if let PathSegment::Capture(name) = segment {
                let bound = self
                    .parameters
                    .iter()
                    .any(|p| p.location == ParamLocation::Path && &p.name == name);
                if !bound {
                    return Err(ConfigError::UnboundPathPlaceholder {
                        route: label,
                        placeholder: name.clone(),
                    });
                }
            }
        }

        Ok(specs)
    }

    /// Basic sanity checks run during [`BridgeConfig::validate()`](crate::validation::BridgeConfig::validate).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile_parameters().map(|_| ())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamType;

    fn path_param(name: &str) -> ParameterSchema {
        ParameterSchema::new(name, ParamType::String).at(ParamLocation::Path)
    }

    #[test]
    fn exact_path_parses_to_literals() {
        assert_eq!(
            parse_path_template("/set_temperature").unwrap(),
            vec![PathSegment::Literal("set_temperature".into())]
        );
    }

    #[test]
    fn placeholders_capture_whole_segments() {
        let segments = parse_path_template("/device/{device_id}/control").unwrap();
        assert_eq!(segments[1], PathSegment::Capture("device_id".into()));
        assert!(parse_path_template("/device/x{id}").is_err());
        assert!(parse_path_template("/device/{}").is_err());
        assert!(parse_path_template("/a/{id}/b/{id}").is_err());
        assert!(parse_path_template("device").is_err());
    }

    #[test]
    fn normalized_pattern_erases_capture_names() {
        let a = parse_path_template("/a/{x}/c").unwrap();
        let b = parse_path_template("/a/{y}/c/").unwrap();
        assert_eq!(normalize_pattern(&a), "/a/{}/c");
        assert_eq!(normalize_pattern(&a), normalize_pattern(&b));
        assert_eq!(normalize_pattern(&[]), "/");
    }

    #[test]
    fn route_with_bound_path_placeholder_compiles() {
        let route = RouteDefinition::new("/device/{device_id}/control", "devices/{device_id}", "{}")
            .with_parameter(path_param("device_id"));
        assert_eq!(route.compile_parameters().unwrap().len(), 1);
    }

    #[test]
    fn unbound_path_placeholder_is_rejected() {
        let route = RouteDefinition::new("/device/{device_id}", "devices", "{}");
        assert!(matches!(
            route.validate(),
            Err(ConfigError::UnboundPathPlaceholder { ref placeholder, .. }) if placeholder == "device_id"
        ));
    }

    #[test]
    fn placeholder_bound_to_query_parameter_is_rejected() {
        let route = RouteDefinition::new("/device/{device_id}", "devices", "{}")
            .with_parameter(ParameterSchema::new("device_id", ParamType::String));
        assert!(matches!(
            route.validate(),
            Err(ConfigError::UnboundPathPlaceholder { .. })
        ));
    }

    #[test]
    fn path_parameter_missing_from_path_is_rejected() {
        let route =
            RouteDefinition::new("/device", "devices", "{}").with_parameter(path_param("device_id"));
        assert!(matches!(
            route.validate(),
            Err(ConfigError::PathParameterNotInPath { ref parameter, .. }) if parameter == "device_id"
        ));
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let route = RouteDefinition::new("/x", "t", "{}")
            .with_parameter(ParameterSchema::new("a", ParamType::String))
            .with_parameter(ParameterSchema::new("a", ParamType::Integer));
        assert!(matches!(
            route.validate(),
            Err(ConfigError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn qos_above_two_is_rejected() {
        let route = RouteDefinition::new("/x", "t", "{}").with_delivery(3, false);
        assert_eq!(
            route.validate(),
            Err(ConfigError::InvalidQos {
                route: "POST /x".to_string(),
                qos: 3
            })
        );
    }

    #[test]
    fn route_deserializes_with_legacy_topic_key() {
        let route: RouteDefinition = serde_yaml::from_str(
            r#"
path: /test/simple
method: get
mqtt_topic: test/simple
payload_template: '{"message": "{{ message }}"}'
qos: 1
parameters:
  - name: message
    type: string
"#,
        )
        .unwrap();
        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.topic_template, "test/simple");
        assert_eq!(route.qos().unwrap(), QoS::AtLeastOnce);
        assert!(!route.retain);
        assert_eq!(route.parameters.len(), 1);
    }
}
