//! Request filter trait and filter-chain types.
//!
//! A filter chain is an ordered list of [`BridgeFilter`] instances applied to
//! every bridged request. Filters are sorted by their declared
//! [`FilterOrder`] and executed in ascending order on the request path and
//! descending order on the response path.
//!
//! ```text
//! Request  ──► PreAuth ──► Logging ──► Auth
//!                  (route dispatch happens here)
//! Response ◄── Auth ◄── Logging ◄── PreAuth
//! ```
//!
//! On the way out only the filters whose `on_request` hook ran are
//! unwound: a filter rejecting the request still sees its own response,
//! filters after it see neither side.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;

// ─────────────────────────────────────────────────────────────────────────────
// Filter ordering
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric ordering slot for a filter in the chain.
///
/// Filters with equal order values are executed in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterOrder(pub u32);

impl FilterOrder {
    /// Executes before all authentication logic.
    pub const PRE_AUTH: FilterOrder = FilterOrder(0);
    /// Access logging slot, ahead of authentication so rejections are logged.
    pub const LOGGING: FilterOrder = FilterOrder(50);
    /// Authentication filter slot.
    pub const AUTH: FilterOrder = FilterOrder(100);
}

// ─────────────────────────────────────────────────────────────────────────────
// Filter action
// ─────────────────────────────────────────────────────────────────────────────

/// Instruction returned by [`BridgeFilter::on_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterAction {
    /// Pass the request to the next filter or to route dispatch.
    Continue,
    /// Short-circuit with the given HTTP status and message.
    Reject(u16, String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Request context
// ─────────────────────────────────────────────────────────────────────────────

/// Per-request context that flows through the filter chain.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for correlating this request across logs.
    pub request_id: String,
    /// Raw HTTP method as received.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// HTTP headers (header names are lowercased).
    pub headers: HashMap<String, String>,
    /// Identity principal resolved by the auth filter.
    pub auth_principal: Option<String>,
    /// Label of the matched route, once dispatch has resolved it.
    pub route: Option<String>,
    pub received_at: Instant,
}

impl RequestContext {
    pub fn new(
        request_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            auth_principal: None,
            route: None,
            received_at: Instant::now(),
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Milliseconds since the request was received.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.received_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BridgeFilter trait
// ─────────────────────────────────────────────────────────────────────────────

/// Contract for a single filter in the request pipeline.
#[async_trait]
pub trait BridgeFilter: Send + Sync {
    /// Stable, human-readable identifier for this filter (used in logs).
    fn name(&self) -> &str;

    /// Position in the filter chain.
    fn order(&self) -> FilterOrder;

    /// Called before route dispatch. Return [`FilterAction::Reject`] to
    /// short-circuit.
    async fn on_request(&self, ctx: &mut RequestContext) -> FilterAction;

    /// Called with the final response status. Only invoked when this
    /// filter's `on_request` ran for the same request.
    async fn on_response(&self, ctx: &RequestContext, status: u16);
}
