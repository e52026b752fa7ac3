//! Broker publish contract.
//!
//! [`PublishGateway`] is the narrow seam between request dispatch and the
//! broker client. An implementation either hands the message to its broker
//! transport and returns a [`PublishReceipt`], or returns a typed
//! [`PublishError`]; it never drops a message silently. QoS 1/2 delivery
//! semantics belong to the underlying client.
//!
//! Implementations must be `Send + Sync`: a single gateway instance is shared
//! by every in-flight request.

use crate::types::QoS;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Confirmation that a message was accepted by the broker transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    /// The topic the message was published to.
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
}

/// Broker-side publish failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PublishError {
    /// The broker connection is down or the client has shut down.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// The message cannot be encoded for the broker (e.g. exceeds the
    /// maximum packet size).
    #[error("message serialization failed: {0}")]
    Serialization(String),

    /// The broker client refused the message (e.g. invalid topic).
    #[error("broker rejected message: {0}")]
    Rejected(String),

    /// The publish did not complete within the enforced bound.
    #[error("publish timed out after {0} ms")]
    Timeout(u64),
}

impl PublishError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PublishError::Timeout(_))
    }
}

pub type PublishResult = Result<PublishReceipt, PublishError>;

/// Kernel contract for handing rendered messages to a broker.
#[async_trait]
pub trait PublishGateway: Send + Sync {
    /// Stable, human-readable identifier (used in logs).
    fn name(&self) -> &str;

    /// Publish `payload` to `topic` with the given delivery options.
    async fn publish(&self, topic: &str, payload: &str, qos: QoS, retain: bool) -> PublishResult;

    /// Last known connection state.
    fn is_connected(&self) -> bool;
}
