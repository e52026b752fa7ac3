//! Axum-based HTTP bridge server.
//!
//! [`BridgeServer`] wires together the compiled dispatch table, the filter
//! pipeline and the publish gateway into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service name, version and route count. |
//! | `GET`  | `/health` | Liveness check with broker connection state. |
//! | per route | `/{api_version}/...` | Bridged routes from the configuration. |
//!
//! Bridged routes are not registered with axum individually: a single
//! fallback handler resolves them against the dispatch table, so overlapping
//! capture templates and 405 handling follow the bridge's own rules.

use crate::compiler::{Dispatch, RouteCompiler};
use crate::dispatcher::PublishOutcome;
use crate::error::{DispatchError, DispatchResult};
use crate::filter::{ApiKeyFilter, FilterPipeline, LoggingFilter};
use crate::handlers::health_router;
use crate::resolver::{parse_body, RawRequest};
use crate::state::AppState;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use mqbridge_kernel::{
    BridgeConfig, BridgeFilter, ConfigError, FilterAction, PublishGateway, RequestContext,
};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// ServerError
// ─────────────────────────────────────────────────────────────────────────────

/// Failure to bring the server up or keep it running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bridge configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// BridgeServer
// ─────────────────────────────────────────────────────────────────────────────

/// High-level server encapsulating the route table, filters and gateway.
pub struct BridgeServer {
    config: BridgeConfig,
    gateway: Arc<dyn PublishGateway>,
}

impl BridgeServer {
    pub fn new(config: BridgeConfig, gateway: Arc<dyn PublishGateway>) -> Self {
        Self { config, gateway }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// `host:port` from the server section.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }

    /// Build the axum [`Router`] for the configured routes.
    ///
    /// Validates the configuration and compiles every route; any defect is
    /// returned before a socket is bound.
    pub fn build_app(&self) -> Result<Router, ConfigError> {
        self.config.validate()?;

        let table =
            RouteCompiler::from_config(&self.config, Arc::clone(&self.gateway)).compile(&self.config.routes)?;

        let mut filters: Vec<Arc<dyn BridgeFilter>> = vec![Arc::new(LoggingFilter::new())];
        let auth = ApiKeyFilter::new(self.config.auth.api_keys.iter().cloned());
        if auth.is_empty() {
            warn!("no API keys configured: authentication is DISABLED for bridged routes");
        } else {
            filters.push(Arc::new(auth));
        }

        let state = AppState::new(
            table,
            FilterPipeline::new(filters),
            Arc::clone(&self.gateway),
            self.config.api_version.trim(),
        );

        Ok(health_router()
            .fallback(dispatch_handler)
            .with_state(Arc::new(state)))
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight
    /// requests.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.build_app()?;
        let addr = listener.local_addr()?;
        info!(
            addr = %addr,
            routes = self.config.routes.len(),
            api_version = %self.config.api_version,
            "MQTT webhook bridge listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received");
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Fallback handler: every request not served by a fixed endpoint is
/// resolved against the dispatch table.
async fn dispatch_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let mut ctx = RequestContext::new(&request_id, method.as_str(), uri.path());
    for (name, value) in &headers {
        if let Ok(v) = value.to_str() {
            ctx = ctx.with_header(name.as_str(), v);
        }
    }

    let mut entered = None;
    let response = match dispatch(&state, &mut ctx, &uri, &body, &mut entered).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => err.into_response(),
    };

    let status = response.status().as_u16();
    match entered {
        Some(entered) => state.pipeline.run_response(&ctx, status, entered).await,
        None => warn!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            status = status,
            "Unrouted request"
        ),
    }
    response
}

/// Resolve and run one bridged request. `entered` is set once the filter
/// pipeline's request side has run.
async fn dispatch(
    state: &AppState,
    ctx: &mut RequestContext,
    uri: &Uri,
    body: &Bytes,
    entered: &mut Option<usize>,
) -> DispatchResult<PublishOutcome> {
    let (handler, path_params) = match state.table.lookup(&ctx.method, &ctx.path) {
        Dispatch::Found {
            handler,
            path_params,
        } => (handler, path_params),
        Dispatch::MethodNotAllowed(allowed) => {
            return Err(DispatchError::MethodNotAllowed {
                method: ctx.method.clone(),
                path: ctx.path.clone(),
                allowed,
            });
        }
        Dispatch::NotFound => {
            return Err(DispatchError::RouteNotFound {
                method: ctx.method.clone(),
                path: ctx.path.clone(),
            });
        }
    };
    ctx.route = Some(handler.label().to_string());

    // FilterAction is #[non_exhaustive]; unknown variants continue.
    let pass = state.pipeline.run_request(ctx).await;
    *entered = Some(pass.entered);
    if let FilterAction::Reject(status, message) = pass.action {
        return Err(DispatchError::Rejected { status, message });
    }

    let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|rejection| DispatchError::MalformedQuery(rejection.body_text()))?;

    let mut raw = RawRequest::new();
    raw.set_query(query);
    raw.set_path_params(path_params);
    if handler.reads_body() {
        if let Some(fields) = parse_body(body)? {
            raw = raw.with_body(fields);
        }
    }

    handler.handle(&raw).await
}

// =============================================================================
// Tests
// =============================================================================
