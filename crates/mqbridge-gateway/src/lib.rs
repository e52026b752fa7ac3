//! `mqbridge-gateway`: HTTP → MQTT webhook bridge runtime.
//!
//! This crate provides the concrete implementations of the contracts defined
//! in `mqbridge-kernel`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`PublishGateway`](mqbridge_kernel::PublishGateway) | [`backend::MqttGateway`], [`backend::RecordingGateway`] |
//! | [`BridgeFilter`](mqbridge_kernel::BridgeFilter) | [`filter::ApiKeyFilter`], [`filter::LoggingFilter`] |
//! | [`RouteDefinition`](mqbridge_kernel::RouteDefinition) | [`compiler::RouteCompiler`] → [`dispatcher::RouteHandler`] |
//!
//! The [`server::BridgeServer`] wires everything together into an axum HTTP
//! service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use mqbridge_gateway::backend::MqttGateway;
//! use mqbridge_gateway::server::{BridgeServer, shutdown_signal};
//! use mqbridge_kernel::config::load_bridge_config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_bridge_config("config/routes.yaml")?;
//!     let gateway = Arc::new(MqttGateway::connect(&config.mqtt).await?);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!
//!     BridgeServer::new(config, gateway.clone())
//!         .serve(listener, shutdown_signal())
//!         .await?;
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod compiler;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod resolver;
pub mod router;
pub mod server;
pub mod state;
pub mod template;

// Re-export the kernel crate for convenience.
pub use mqbridge_kernel as kernel;
