//! API-key authentication filter.
//!
//! Accepts requests that carry a valid API key in either:
//! - `X-API-Key: <key>` header
//! - `Authorization: Bearer <key>` header
//!
//! Requests without a valid key receive a `401 Unauthorized` response.
//! When no keys are configured the filter is not installed at all.

use async_trait::async_trait;
use mqbridge_kernel::{BridgeFilter, FilterAction, FilterOrder, RequestContext};
use std::collections::HashSet;
use tracing::warn;

pub(crate) const MISSING_KEY_MESSAGE: &str =
    "Missing API key. Include 'X-API-Key' header with your request.";
pub(crate) const INVALID_KEY_MESSAGE: &str = "Invalid API key";

/// Authentication filter that enforces API key validation.
pub struct ApiKeyFilter {
    valid_keys: HashSet<String>,
}

impl ApiKeyFilter {
    /// Build the filter from a list of valid keys. Blank keys are ignored.
    pub fn new(valid_keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            valid_keys: valid_keys
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.trim().is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.valid_keys.is_empty()
    }

    fn extract_key(ctx: &RequestContext) -> Option<&str> {
        if let Some(key) = ctx.header("x-api-key") {
            return Some(key);
        }
        ctx.header("authorization")
            .and_then(|auth| auth.strip_prefix("Bearer "))
            .map(str::trim)
    }
}

/// Principal recorded for an accepted key: enough to tell keys apart in
/// logs without writing the secret out.
fn mask(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("key:{prefix}…")
}

#[async_trait]
impl BridgeFilter for ApiKeyFilter {
    fn name(&self) -> &str {
        "api-key-auth"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::AUTH
    }

    async fn on_request(&self, ctx: &mut RequestContext) -> FilterAction {
        match Self::extract_key(ctx) {
            Some(key) if self.valid_keys.contains(key) => {
                ctx.auth_principal = Some(mask(key));
                FilterAction::Continue
            }
            Some(_) => {
                warn!(request_id = %ctx.request_id, path = %ctx.path, "rejected request: invalid API key");
                FilterAction::Reject(401, INVALID_KEY_MESSAGE.to_string())
            }
            None => {
                warn!(request_id = %ctx.request_id, path = %ctx.path, "rejected request: missing API key");
                FilterAction::Reject(401, MISSING_KEY_MESSAGE.to_string())
            }
        }
    }

    async fn on_response(&self, _ctx: &RequestContext, _status: u16) {}
}
