//! Shared application state for the bridge server

use crate::compiler::DispatchTable;
use crate::filter::FilterPipeline;
use mqbridge_kernel::PublishGateway;
use std::sync::Arc;

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Compiled routes; immutable for the lifetime of the server
    pub table: Arc<DispatchTable>,
    /// Filters applied to bridged routes
    pub pipeline: Arc<FilterPipeline>,
    /// Broker gateway, queried for connection state
    pub gateway: Arc<dyn PublishGateway>,
    pub api_version: String,
}

impl AppState {
    pub fn new(
        table: DispatchTable,
        pipeline: FilterPipeline,
        gateway: Arc<dyn PublishGateway>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            table: Arc::new(table),
            pipeline: Arc::new(pipeline),
            gateway,
            api_version: api_version.into(),
        }
    }
}
