//! Route compilation.
//!
//! [`RouteCompiler`] turns the configured [`RouteDefinition`]s into an
//! immutable [`DispatchTable`]: one [`RouteHandler`] per route, indexed by
//! a router keyed on (method, normalized path pattern). Every structural
//! defect is reported here as a [`ConfigError`]; a table is only returned
//! when every route compiled.

use crate::dispatcher::RouteHandler;
use crate::router::{RouteLookup, TrieRouter};
use crate::template::{PayloadTemplate, TopicTemplate};
use mqbridge_kernel::{
    BridgeConfig, ConfigError, HttpMethod, PathSegment, PublishGateway, RouteDefinition,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

// ─────────────────────────────────────────────────────────────────────────────
// DispatchTable
// ─────────────────────────────────────────────────────────────────────────────

/// Result of looking a request up in the [`DispatchTable`].
pub enum Dispatch<'a> {
    Found {
        handler: &'a Arc<RouteHandler>,
        path_params: HashMap<String, String>,
    },
    MethodNotAllowed(Vec<HttpMethod>),
    NotFound,
}

/// Compiled, read-only route table shared by all requests.
pub struct DispatchTable {
    router: TrieRouter,
    handlers: Vec<Arc<RouteHandler>>,
}

impl DispatchTable {
    pub fn lookup(&self, method: &str, path: &str) -> Dispatch<'_> {
        match self.router.resolve(method, path) {
            RouteLookup::Matched { index, path_params } => match self.handlers.get(index) {
                Some(handler) => Dispatch::Found {
                    handler,
                    path_params,
                },
                None => Dispatch::NotFound,
            },
            RouteLookup::MethodNotAllowed { allowed } => Dispatch::MethodNotAllowed(allowed),
            RouteLookup::NotFound => Dispatch::NotFound,
        }
    }

    pub fn handlers(&self) -> &[Arc<RouteHandler>] {
        &self.handlers
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RouteCompiler
// ─────────────────────────────────────────────────────────────────────────────

pub struct RouteCompiler {
    api_version: String,
    gateway: Arc<dyn PublishGateway>,
    publish_timeout: Duration,
}

impl RouteCompiler {
    /// A compiler with no path prefix and a 5 s publish timeout.
    pub fn new(gateway: Arc<dyn PublishGateway>) -> Self {
        Self {
            api_version: String::new(),
            gateway,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// A compiler using the document's api_version and publish timeout.
    pub fn from_config(config: &BridgeConfig, gateway: Arc<dyn PublishGateway>) -> Self {
        Self::new(gateway)
            .with_api_version(config.api_version.trim())
            .with_publish_timeout(Duration::from_millis(config.mqtt.publish_timeout_ms))
    }

    /// Builder: prefix every compiled path with `/{api_version}`.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Compile every route, in declaration order.
    ///
    /// Checks performed per route (in order):
    /// 1. Route-level invariants ([`RouteDefinition::compile_parameters`]).
    /// 2. The topic template parses and names only declared parameters.
    /// 3. The payload template parses.
    /// 4. No earlier route uses the same method and path pattern.
    pub fn compile(&self, routes: &[RouteDefinition]) -> Result<DispatchTable, ConfigError> {
        let mut router = TrieRouter::new();
        let mut handlers = Vec::with_capacity(routes.len());

        for (index, route) in routes.iter().enumerate() {
            let label = route.label();
            let parameters = route.compile_parameters()?;
            let qos = route.qos()?;

            let topic = TopicTemplate::parse(&route.topic_template).map_err(|reason| {
                ConfigError::InvalidTopicTemplate {
                    route: label.clone(),
                    reason,
                }
            })?;
            if let Some(unknown) = topic
                .placeholders()
                .find(|name| !parameters.iter().any(|p| p.name() == *name))
            {
                return Err(ConfigError::UnknownTopicPlaceholder {
                    route: label,
                    placeholder: unknown.to_string(),
                });
            }

            let payload = PayloadTemplate::parse(&route.payload_template).map_err(|reason| {
                ConfigError::InvalidPayloadTemplate {
                    route: label.clone(),
                    reason,
                }
            })?;

            let mut segments = Vec::new();
            if !self.api_version.is_empty() {
                segments.push(PathSegment::Literal(self.api_version.clone()));
            }
            segments.extend(route.path_segments()?);
            let path = full_path(&segments);

            router
                .register(route.method, segments, index)
                .map_err(|_| ConfigError::DuplicateRoute(label.clone()))?;

            debug!(
                route = %label,
                path = %path,
                topic = %route.topic_template,
                qos = qos.as_u8(),
                retain = route.retain,
                "Compiled route"
            );

            handlers.push(Arc::new(RouteHandler::new(
                label,
                route.method,
                path,
                parameters,
                topic,
                payload,
                qos,
                route.retain,
                Arc::clone(&self.gateway),
                self.publish_timeout,
            )));
        }

        info!(routes = handlers.len(), gateway = self.gateway.name(), "Dispatch table built");
        Ok(DispatchTable { router, handlers })
    }
}

fn full_path(segments: &[PathSegment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    segments
        .iter()
        .map(|s| match s {
            PathSegment::Literal(l) => format!("/{l}"),
            PathSegment::Capture(c) => format!("/{{{c}}}"),
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingGateway;
    use crate::error::DispatchError;
    use crate::resolver::RawRequest;
    use mqbridge_kernel::{
        ParamLocation, ParamType, ParamValue, ParameterSchema, PublishError, QoS,
    };
    use serde_json::json;

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn set_temperature() -> RouteDefinition {
        RouteDefinition::new(
            "/set_temperature",
            "command/set_temperature/{room}",
            r#"{"room": "{{room}}", "target_temperature": {{target}}}"#,
        )
        .with_parameter(ParameterSchema::new("room", ParamType::String))
        .with_parameter(
            ParameterSchema::new("target", ParamType::Float).with_range(Some(10.0), Some(30.0)),
        )
        .with_delivery(1, false)
    }

    fn compiler(gateway: Arc<RecordingGateway>) -> RouteCompiler {
        RouteCompiler::new(gateway).with_api_version("v1")
    }

    fn handler<'a>(table: &'a DispatchTable, method: &str, path: &str) -> &'a Arc<RouteHandler> {
        match table.lookup(method, path) {
            Dispatch::Found { handler, .. } => handler,
            _ => panic!("expected {method} {path} to resolve"),
        }
    }

    // ── Compile-time checks ──────────────────────────────────────────────────

    #[test]
    fn compiled_paths_carry_the_api_version_prefix() {
        let table = compiler(Arc::new(RecordingGateway::new()))
            .compile(&[set_temperature()])
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(handler(&table, "POST", "/v1/set_temperature").path(), "/v1/set_temperature");
        assert!(matches!(table.lookup("POST", "/set_temperature"), Dispatch::NotFound));
    }

    #[test]
    fn colliding_routes_are_rejected() {
        let a = RouteDefinition::new("/device/{a}", "t", "{}")
            .with_parameter(ParameterSchema::new("a", ParamType::String).at(ParamLocation::Path));
        let b = RouteDefinition::new("/device/{b}", "t", "{}")
            .with_parameter(ParameterSchema::new("b", ParamType::String).at(ParamLocation::Path));
        let err = compiler(Arc::new(RecordingGateway::new()))
            .compile(&[a, b])
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::DuplicateRoute("POST /device/{b}".into()));
    }

    #[test]
    fn unknown_topic_placeholder_is_rejected() {
        let route = RouteDefinition::new("/x", "devices/{device}", "{}");
        let err = compiler(Arc::new(RecordingGateway::new()))
            .compile(&[route])
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ConfigError::UnknownTopicPlaceholder { ref placeholder, .. } if placeholder == "device"
        ));
    }

    #[test]
    fn unparsable_templates_are_rejected() {
        let gateway = Arc::new(RecordingGateway::new());
        let bad_topic = RouteDefinition::new("/x", "devices/{", "{}");
        assert!(matches!(
            compiler(Arc::clone(&gateway)).compile(&[bad_topic]).err().unwrap(),
            ConfigError::InvalidTopicTemplate { .. }
        ));

        let bad_payload = RouteDefinition::new("/x", "t", "{% if x %}never closed");
        assert!(matches!(
            compiler(gateway).compile(&[bad_payload]).err().unwrap(),
            ConfigError::InvalidPayloadTemplate { .. }
        ));
    }

    // ── Request pipeline ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn valid_request_reaches_the_gateway_once() {
        let gateway = Arc::new(RecordingGateway::new());
        let table = compiler(Arc::clone(&gateway)).compile(&[set_temperature()]).unwrap();

        let raw = RawRequest::new()
            .with_query("room", "bedroom")
            .with_query("target", "21.5");
        let outcome = handler(&table, "POST", "/v1/set_temperature")
            .handle(&raw)
            .await
            .unwrap();

        assert_eq!(outcome.topic, "command/set_temperature/bedroom");
        assert_eq!(outcome.parameters.get("target"), Some(&ParamValue::Float(21.5)));
        let published = gateway.published();
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].payload,
            r#"{"room": "bedroom", "target_temperature": 21.5}"#
        );
        assert_eq!(published[0].qos, QoS::AtLeastOnce);
        assert!(!published[0].retain);
    }

    #[tokio::test]
    async fn validation_failure_skips_the_gateway() {
        let gateway = Arc::new(RecordingGateway::new());
        let table = compiler(Arc::clone(&gateway)).compile(&[set_temperature()]).unwrap();

        let raw = RawRequest::new().with_query("room", "bedroom");
        let err = handler(&table, "POST", "/v1/set_temperature")
            .handle(&raw)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "MissingParameter");
        assert_eq!(gateway.attempts(), 0);
    }

    #[tokio::test]
    async fn omitted_optional_parameter_in_payload_is_a_template_error() {
        let gateway = Arc::new(RecordingGateway::new());
        let route = RouteDefinition::new("/run", "t", r#"{"d": {{ duration }}}"#)
            .with_parameter(ParameterSchema::new("duration", ParamType::Integer).optional());
        let table = compiler(Arc::clone(&gateway)).compile(&[route]).unwrap();

        let err = handler(&table, "POST", "/v1/run")
            .handle(&RawRequest::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Template(_)));
        assert!(err.to_string().contains("duration"), "{err}");
        assert_eq!(gateway.attempts(), 0);
    }

    #[tokio::test]
    async fn body_parameters_are_resolved_from_json() {
        let gateway = Arc::new(RecordingGateway::new());
        let route = RouteDefinition::new("/light", "home/light", r#"{"state": "{{ state }}"}"#)
            .with_parameter(
                ParameterSchema::new("state", ParamType::String)
                    .at(ParamLocation::Body)
                    .with_enum(vec![json!("on"), json!("off")]),
            );
        let table = compiler(Arc::clone(&gateway)).compile(&[route]).unwrap();
        let handler = handler(&table, "POST", "/v1/light");
        assert!(handler.reads_body());

        let body = json!({ "state": "on" }).as_object().cloned().unwrap();
        handler.handle(&RawRequest::new().with_body(body)).await.unwrap();
        assert_eq!(gateway.published()[0].payload, r#"{"state": "on"}"#);
    }

    #[tokio::test]
    async fn gateway_failure_is_reported_without_retry() {
        let gateway = Arc::new(RecordingGateway::failing(PublishError::BrokerUnavailable(
            "connection refused".into(),
        )));
        let table = compiler(Arc::clone(&gateway)).compile(&[set_temperature()]).unwrap();

        let raw = RawRequest::new()
            .with_query("room", "bedroom")
            .with_query("target", "21.5");
        let err = handler(&table, "POST", "/v1/set_temperature")
            .handle(&raw)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "PublishFailure");
        assert_eq!(gateway.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_publish_times_out() {
        let gateway = Arc::new(RecordingGateway::stalling());
        let table = compiler(Arc::clone(&gateway))
            .with_publish_timeout(Duration::from_millis(250))
            .compile(&[set_temperature()])
            .unwrap();

        let raw = RawRequest::new()
            .with_query("room", "bedroom")
            .with_query("target", "21.5");
        let err = handler(&table, "POST", "/v1/set_temperature")
            .handle(&raw)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Publish(PublishError::Timeout(250))));
    }
}
