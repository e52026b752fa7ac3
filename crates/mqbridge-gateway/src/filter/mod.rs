//! Filter module.

mod auth;
mod logger;

pub use auth::ApiKeyFilter;
pub use logger::LoggingFilter;

use mqbridge_kernel::{BridgeFilter, FilterAction, RequestContext};
use std::sync::Arc;

/// Outcome of the request side of a [`FilterPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPass {
    pub action: FilterAction,
    /// Number of filters whose `on_request` hook ran, the rejecting one
    /// included.
    pub entered: usize,
}

/// Ordered list of filters executed around every bridged request.
///
/// Filters are sorted by [`FilterOrder`](mqbridge_kernel::FilterOrder) in
/// ascending order (lowest value runs first on request path).
#[derive(Default)]
pub struct FilterPipeline {
    filters: Vec<Arc<dyn BridgeFilter>>,
}

impl FilterPipeline {
    /// Build a pipeline from a list of filters, sorted by their declared order.
    pub fn new(mut filters: Vec<Arc<dyn BridgeFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run all filters' `on_request` hooks in ascending order.
    ///
    /// Short-circuits on the first `Reject`.
    pub async fn run_request(&self, ctx: &mut RequestContext) -> FilterPass {
        for (position, filter) in self.filters.iter().enumerate() {
            match filter.on_request(ctx).await {
                FilterAction::Continue => {}
                action => {
                    return FilterPass {
                        action,
                        entered: position + 1,
                    };
                }
            }
        }
        FilterPass {
            action: FilterAction::Continue,
            entered: self.filters.len(),
        }
    }

    /// Run `on_response` in descending order for the first `entered`
    /// filters, the ones a [`FilterPass`] reported as having seen the request.
    pub async fn run_response(&self, ctx: &RequestContext, status: u16, entered: usize) {
        let entered = entered.min(self.filters.len());
        for filter in self.filters[..entered].iter().rev() {
            filter.on_response(ctx, status).await;
        }
    }
}
