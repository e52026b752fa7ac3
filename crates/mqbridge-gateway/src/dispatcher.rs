//! Per-route request pipeline.
//!
//! A [`RouteHandler`] is the compiled, closed-over form of one route
//! definition. Handling a request walks a fixed sequence and stops at the
//! first failure:
//!
//! ```text
//! Received → Resolved → Rendered(topic) → Rendered(payload) → Published → Responded
//! ```
//!
//! Handlers hold no per-request state; one instance serves every
//! concurrent request for its route.

use crate::error::{DispatchError, DispatchResult};
use crate::resolver::{resolve, RawRequest};
use crate::template::{PayloadTemplate, TopicTemplate};
use mqbridge_kernel::{
    HttpMethod, ParamLocation, ParameterBinding, ParameterSpec, PublishError, PublishGateway, QoS,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Success body of a bridged request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishOutcome {
    pub status: &'static str,
    pub topic: String,
    pub parameters: ParameterBinding,
    pub qos: QoS,
    pub retain: bool,
}

/// A compiled route: resolver, renderers and broker wiring for one endpoint.
pub struct RouteHandler {
    label: String,
    method: HttpMethod,
    path: String,
    parameters: Vec<ParameterSpec>,
    topic: TopicTemplate,
    payload: PayloadTemplate,
    qos: QoS,
    retain: bool,
    gateway: Arc<dyn PublishGateway>,
    publish_timeout: Duration,
}

impl RouteHandler {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        label: String,
        method: HttpMethod,
        path: String,
        parameters: Vec<ParameterSpec>,
        topic: TopicTemplate,
        payload: PayloadTemplate,
        qos: QoS,
        retain: bool,
        gateway: Arc<dyn PublishGateway>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            label,
            method,
            path,
            parameters,
            topic,
            payload,
            qos,
            retain,
            gateway,
            publish_timeout,
        }
    }

    /// Route label, e.g. `POST /set_temperature`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Full path template including the api_version prefix.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn topic_template(&self) -> &str {
        self.topic.source()
    }

    pub fn qos(&self) -> QoS {
        self.qos
    }

    pub fn retain(&self) -> bool {
        self.retain
    }

    /// Whether the request body needs to be parsed for this route.
    pub fn reads_body(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| p.location() == ParamLocation::Body)
    }

    /// Resolve, render and publish one request.
    ///
    /// The publish runs on its own task: once handed to the gateway it
    /// completes even if the caller goes away or the timeout fires first.
    pub async fn handle(&self, raw: &RawRequest) -> DispatchResult<PublishOutcome> {
        let binding = resolve(&self.parameters, raw)?;
        let topic = self.topic.render(&binding)?;
        let payload = self.payload.render(&binding)?;

        debug!(
            route = %self.label,
            topic = %topic,
            payload = %payload,
            "Rendered message"
        );

        let gateway = Arc::clone(&self.gateway);
        let (qos, retain) = (self.qos, self.retain);
        let publish_topic = topic.clone();
        let task = tokio::spawn(async move {
            gateway.publish(&publish_topic, &payload, qos, retain).await
        });

        let receipt = match tokio::time::timeout(self.publish_timeout, task).await {
            Err(_) => {
                let ms = u64::try_from(self.publish_timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(DispatchError::Publish(PublishError::Timeout(ms)));
            }
            Ok(Err(join_error)) => {
                return Err(DispatchError::Publish(PublishError::BrokerUnavailable(
                    format!("publish task failed: {join_error}"),
                )));
            }
            Ok(Ok(result)) => result?,
        };

        info!(
            route = %self.label,
            topic = %receipt.topic,
            qos = receipt.qos.as_u8(),
            retain = receipt.retain,
            "Published message"
        );

        Ok(PublishOutcome {
            status: "published",
            topic: receipt.topic,
            parameters: binding,
            qos: receipt.qos,
            retain: receipt.retain,
        })
    }
}
