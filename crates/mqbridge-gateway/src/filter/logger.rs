//! Structured access-logging filter.
//!
//! Emits one `tracing` event on the way in and one on the way out,
//! recording request id, method, path, matched route, principal, status
//! and latency.

use async_trait::async_trait;
use mqbridge_kernel::{BridgeFilter, FilterAction, FilterOrder, RequestContext};
use tracing::{error, info, warn};

/// Logging filter: records inbound requests and outbound responses.
#[derive(Default)]
pub struct LoggingFilter;

impl LoggingFilter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BridgeFilter for LoggingFilter {
    fn name(&self) -> &str {
        "access-log"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::LOGGING
    }

    async fn on_request(&self, ctx: &mut RequestContext) -> FilterAction {
        info!(
            request_id  = %ctx.request_id,
            method      = %ctx.method,
            path        = %ctx.path,
            route       = ctx.route.as_deref().unwrap_or("-"),
            "→ inbound request"
        );
        FilterAction::Continue
    }

    async fn on_response(&self, ctx: &RequestContext, status: u16) {
        let latency_ms = ctx.elapsed_ms();
        let route = ctx.route.as_deref().unwrap_or("-");
        let principal = ctx.auth_principal.as_deref().unwrap_or("-");

        if status >= 500 {
            error!(
                request_id  = %ctx.request_id,
                path        = %ctx.path,
                route       = route,
                principal   = principal,
                status      = status,
                latency_ms  = latency_ms,
                "← error response"
            );
        } else if status >= 400 {
            warn!(
                request_id  = %ctx.request_id,
                path        = %ctx.path,
                route       = route,
                principal   = principal,
                status      = status,
                latency_ms  = latency_ms,
                "← rejected request"
            );
        } else {
            info!(
                request_id  = %ctx.request_id,
                path        = %ctx.path,
                route       = route,
                principal   = principal,
                status      = status,
                latency_ms  = latency_ms,
                "← outbound response"
            );
        }
    }
}
