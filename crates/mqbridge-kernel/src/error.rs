//! Error types for `mqbridge-kernel`.
//!
//! Errors fall into two phases:
//!
//! - [`ConfigError`] covers every failure detectable at *load time*:
//!   self-contradictory parameter schemas, path/placeholder mismatches,
//!   colliding routes, unparsable templates. A bridge with any
//!   `ConfigError` must not start serving.
//! - [`ValidationError`] and [`TemplateError`] are *request-time* failures.
//!   Validation errors are caused by the caller; template errors point at a
//!   route definition that is only detectably broken once rendered.
//!
//! Broker failures live next to the publish contract in
//! [`crate::publish::PublishError`].

use crate::types::ParamType;
use thiserror::Error;

/// Load-time configuration error. Fatal to startup.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    // ── Document ────────────────────────────────────────────────────────────
    /// The mqtt section names no broker host.
    #[error("mqtt broker host cannot be empty")]
    EmptyBrokerHost,

    /// A timeout setting is zero, which would fail every operation.
    #[error("{0} must be greater than 0 ms")]
    InvalidTimeout(String),

    /// The keep-alive interval is below the broker client's minimum.
    #[error("mqtt keepalive must be at least 5 seconds (got {0})")]
    InvalidKeepAlive(u64),

    /// The api_version cannot be used as a single path segment.
    #[error("api_version '{0}' must be a single path segment")]
    InvalidApiVersion(String),

    // ── Routes ──────────────────────────────────────────────────────────────
    /// A route path template is syntactically invalid.
    #[error("route '{route}' has an invalid path: {reason}")]
    InvalidPath { route: String, reason: String },

    /// Two routes share the same method and path pattern.
    #[error("route '{0}' collides with an earlier route on the same method and path")]
    DuplicateRoute(String),

    /// The route's qos is outside {0, 1, 2}.
    #[error("route '{route}' has invalid qos {qos}; expected 0, 1 or 2")]
    InvalidQos { route: String, qos: u8 },

    /// The path template has a placeholder with no path-located parameter.
    #[error("route '{route}' path placeholder '{{{placeholder}}}' has no matching path parameter")]
    UnboundPathPlaceholder { route: String, placeholder: String },

    /// The topic template cannot be parsed.
    #[error("route '{route}' has an invalid topic template: {reason}")]
    InvalidTopicTemplate { route: String, reason: String },

    /// The topic template references a name that is not a declared parameter.
    #[error("route '{route}' topic template references unknown parameter '{placeholder}'")]
    UnknownTopicPlaceholder { route: String, placeholder: String },

    /// The payload template cannot be parsed.
    #[error("route '{route}' has an invalid payload template: {reason}")]
    InvalidPayloadTemplate { route: String, reason: String },

    // ── Parameters ──────────────────────────────────────────────────────────
    /// A parameter `name` field is empty or not an identifier.
    #[error("route '{route}' has a parameter with an invalid name '{parameter}'")]
    InvalidParameterName { route: String, parameter: String },

    /// Two parameters of one route share a name.
    #[error("route '{route}' declares parameter '{parameter}' more than once")]
    DuplicateParameter { route: String, parameter: String },

    /// A parameter has a default but is still marked required.
    #[error("route '{route}' parameter '{parameter}' has a default but is required")]
    DefaultOnRequired { route: String, parameter: String },

    /// The default value cannot be coerced to the parameter type.
    #[error("route '{route}' parameter '{parameter}' has an invalid default: {reason}")]
    InvalidDefault {
        route: String,
        parameter: String,
        reason: String,
    },

    /// `min`/`max` set on a non-numeric parameter.
    #[error("route '{route}' parameter '{parameter}' of type {ty} cannot have min/max bounds")]
    BoundsOnNonNumeric {
        route: String,
        parameter: String,
        ty: ParamType,
    },

    /// `min` is greater than `max`.
    #[error("route '{route}' parameter '{parameter}' has min greater than max")]
    InvalidBounds { route: String, parameter: String },

    /// The enum list is present but empty.
    #[error("route '{route}' parameter '{parameter}' has an empty enum")]
    EmptyEnum { route: String, parameter: String },

    /// An enum entry cannot be coerced to the parameter type.
    #[error("route '{route}' parameter '{parameter}' has an invalid enum value: {reason}")]
    InvalidEnumValue {
        route: String,
        parameter: String,
        reason: String,
    },

    /// An enum entry lies outside the declared bounds.
    #[error("route '{route}' parameter '{parameter}' enum value {value} is outside min/max")]
    EnumOutOfBounds {
        route: String,
        parameter: String,
        value: String,
    },

    /// A path-located parameter does not appear in the path template.
    #[error("route '{route}' path parameter '{parameter}' does not appear in the path template")]
    PathParameterNotInPath { route: String, parameter: String },
}

/// Request-time validation failure, caused by the caller.
///
/// Every variant except [`ValidationError::MalformedBody`] names the
/// offending parameter.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("missing required parameter '{parameter}'")]
    MissingParameter { parameter: String },

    #[error("parameter '{parameter}' must be a valid {expected}: {reason}")]
    TypeMismatch {
        parameter: String,
        expected: ParamType,
        reason: String,
    },

    #[error("parameter '{parameter}' must be one of [{allowed}]")]
    InvalidEnum { parameter: String, allowed: String },

    #[error("parameter '{parameter}' must be {bounds}")]
    OutOfRange { parameter: String, bounds: String },

    #[error("request body must be a JSON object: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    /// Stable error kind reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingParameter { .. } => "MissingParameter",
            ValidationError::TypeMismatch { .. } => "TypeMismatch",
            ValidationError::InvalidEnum { .. } => "InvalidEnum",
            ValidationError::OutOfRange { .. } => "OutOfRange",
            ValidationError::MalformedBody(_) => "MalformedBody",
        }
    }

    /// The schema rule that was violated.
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::MissingParameter { .. } => "required",
            ValidationError::TypeMismatch { .. } => "type",
            ValidationError::InvalidEnum { .. } => "enum",
            ValidationError::OutOfRange { .. } => "range",
            ValidationError::MalformedBody(_) => "body",
        }
    }

    /// Name of the offending parameter, if the error concerns one.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            ValidationError::MissingParameter { parameter }
            | ValidationError::TypeMismatch { parameter, .. }
            | ValidationError::InvalidEnum { parameter, .. }
            | ValidationError::OutOfRange { parameter, .. } => Some(parameter),
            ValidationError::MalformedBody(_) => None,
        }
    }
}

/// Request-time rendering failure. Indicates a route definition defect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateError {
    /// A template references a name absent from the binding.
    #[error("template references unbound parameter '{0}'")]
    UnboundVariable(String),

    /// The template engine failed while evaluating an expression.
    #[error("template rendering failed: {0}")]
    Render(String),
}
