//! Request-time error mapping.
//!
//! [`DispatchError`] unifies every failure a bridged request can end in and
//! renders it as a JSON body:
//!
//! ```json
//! {"error": {"kind": "OutOfRange", "message": "...", "parameter": "target", "rule": "range"}}
//! ```
//!
//! Caller-caused failures map to 4xx; template and broker failures to 5xx.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mqbridge_kernel::{HttpMethod, PublishError, TemplateError, ValidationError};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Gateway-level errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("malformed query string: {0}")]
    MalformedQuery(String),

    #[error("no route matched {method} '{path}'")]
    RouteNotFound { method: String, path: String },

    #[error("method {method} is not allowed on '{path}'")]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: Vec<HttpMethod>,
    },

    #[error("{message}")]
    Rejected { status: u16, message: String },
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Validation(ValidationError::MalformedBody(_)) => StatusCode::BAD_REQUEST,
            DispatchError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DispatchError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::Publish(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            DispatchError::Publish(_) => StatusCode::BAD_GATEWAY,
            DispatchError::MalformedQuery(_) => StatusCode::BAD_REQUEST,
            DispatchError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::Rejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::FORBIDDEN)
            }
        }
    }

    /// Stable error kind reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Validation(e) => e.kind(),
            DispatchError::Template(_) => "TemplateError",
            DispatchError::Publish(e) if e.is_timeout() => "PublishTimeout",
            DispatchError::Publish(_) => "PublishFailure",
            DispatchError::MalformedQuery(_) => "MalformedQuery",
            DispatchError::RouteNotFound { .. } => "RouteNotFound",
            DispatchError::MethodNotAllowed { .. } => "MethodNotAllowed",
            DispatchError::Rejected { status: 401, .. } => "Unauthorized",
            DispatchError::Rejected { .. } => "Rejected",
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut error = Map::new();
        error.insert("kind".into(), Value::from(self.kind()));
        error.insert("message".into(), Value::from(self.to_string()));
        if let DispatchError::Validation(e) = &self {
            if let Some(parameter) = e.parameter() {
                error.insert("parameter".into(), Value::from(parameter));
            }
            error.insert("rule".into(), Value::from(e.rule()));
        }

        let mut response = (status, Json(json!({ "error": error }))).into_response();
        match &self {
            DispatchError::MethodNotAllowed { allowed, .. } => {
                let allow = allowed
                    .iter()
                    .map(HttpMethod::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
            }
            DispatchError::Rejected { status: 401, .. } => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey"));
            }
            _ => {}
        }
        response
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use mqbridge_kernel::ParamType;

    #[test]
    fn validation_errors_are_client_errors() {
        let err = DispatchError::from(ValidationError::TypeMismatch {
            parameter: "target".into(),
            expected: ParamType::Float,
            reason: "invalid float literal".into(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.kind(), "TypeMismatch");

        let err = DispatchError::from(ValidationError::MalformedBody("eof".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn server_side_errors_are_distinguished() {
        let template = DispatchError::from(TemplateError::UnboundVariable("x".into()));
        assert_eq!(template.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let failure = DispatchError::from(PublishError::BrokerUnavailable("down".into()));
        assert_eq!(failure.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(failure.kind(), "PublishFailure");

        let timeout = DispatchError::from(PublishError::Timeout(5000));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.kind(), "PublishTimeout");
    }

    #[test]
    fn unauthorized_response_carries_challenge_header() {
        let response = DispatchError::Rejected {
            status: 401,
            message: "Invalid API key".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "ApiKey"
        );
    }

    #[test]
    fn method_not_allowed_lists_allowed_methods() {
        let response = DispatchError::MethodNotAllowed {
            method: "GET".into(),
            path: "/v1/x".into(),
            allowed: vec![HttpMethod::Post],
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
    }
}
