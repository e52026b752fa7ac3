//! Kernel contracts for the mqbridge webhook-to-MQTT bridge.
//!
//! This crate defines the *declarative types and trait interfaces* of the
//! bridge. No HTTP server or broker client lives here; those belong in
//! `mqbridge-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              mqbridge-kernel  (this crate)                  │
//! │  RouteDefinition + ParameterSchema    BridgeConfig          │
//! │  PublishGateway trait    BridgeFilter trait                 │
//! │  ConfigError / ValidationError / TemplateError              │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              mqbridge-gateway  (runtime crate)              │
//! │  RouteCompiler → DispatchTable    TemplateEngine            │
//! │  ApiKeyFilter / LoggingFilter     MqttGateway (rumqttc)     │
//! │  BridgeServer  (axum HTTP server)                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use mqbridge_kernel::{
//!     BridgeConfig, MqttConfig, ParamType, ParameterSchema, RouteDefinition,
//! };
//!
//! let config = BridgeConfig::new(MqttConfig::new("localhost")).with_route(
//!     RouteDefinition::new(
//!         "/set_temperature",
//!         "home/thermostat/set",
//!         r#"{"temperature": {{ temperature }}}"#,
//!     )
//!     .with_parameter(
//!         ParameterSchema::new("temperature", ParamType::Float)
//!             .with_range(Some(10.0), Some(30.0)),
//!     )
//!     .with_delivery(1, false),
//! );
//!
//! config.validate().expect("bridge config is valid");
//! ```

#[cfg(feature = "config")]
pub mod config;
pub mod error;
pub mod filter;
pub mod publish;
pub mod route;
pub mod schema;
pub mod types;
pub mod validation;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use error::{ConfigError, TemplateError, ValidationError};
pub use filter::{BridgeFilter, FilterAction, FilterOrder, RequestContext};
pub use publish::{PublishError, PublishGateway, PublishReceipt, PublishResult};
pub use route::{normalize_pattern, parse_path_template, PathSegment, RouteDefinition};
pub use schema::{is_identifier, ParameterSchema, ParameterSpec};
pub use types::{
    format_float, HttpMethod, ParamLocation, ParamType, ParamValue, ParameterBinding, QoS,
};
pub use validation::{AuthConfig, BridgeConfig, MqttConfig, ServerConfig};
