//! MQTT [`PublishGateway`] backed by `rumqttc`.
//!
//! One long-lived client is opened at startup and shared by every request.
//! Its event loop runs on a background task that tracks connection state;
//! `rumqttc` reconnects on the next poll after a connection error.

use async_trait::async_trait;
use mqbridge_kernel::{MqttConfig, PublishError, PublishGateway, PublishReceipt, PublishResult, QoS};
use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Bounded request channel between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 64;
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
const CONNECT_RETRY: Duration = Duration::from_millis(500);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct MqttGateway {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    max_packet_size: usize,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttGateway {
    /// Client options derived from the mqtt configuration section.
    pub fn options(config: &MqttConfig) -> MqttOptions {
        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(config.keepalive));
        options.set_max_packet_size(config.max_packet_size, config.max_packet_size);
        if let Some(username) = &config.username {
            options.set_credentials(username, config.password.as_deref().unwrap_or_default());
        }
        options
    }

    /// Connect to the broker and wait for the first CONNACK.
    ///
    /// Connection errors are retried until `connect_timeout_ms` elapses.
    pub async fn connect(config: &MqttConfig) -> Result<Self, PublishError> {
        let (client, mut event_loop) = AsyncClient::new(Self::options(config), REQUEST_CAPACITY);
        let broker = format!("{}:{}", config.broker, config.port);
        let deadline = Duration::from_millis(config.connect_timeout_ms);

        debug!(broker = %broker, client_id = %config.client_id, "Connecting to MQTT broker");
        if tokio::time::timeout(deadline, wait_for_connack(&mut event_loop, &broker))
            .await
            .is_err()
        {
            return Err(PublishError::BrokerUnavailable(format!(
                "no CONNACK from {broker} within {} ms",
                config.connect_timeout_ms
            )));
        }
        info!(broker = %broker, "Connected to MQTT broker");

        let connected = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(run_event_loop(event_loop, Arc::clone(&connected)));

        Ok(Self {
            client,
            connected,
            max_packet_size: config.max_packet_size,
            event_loop: Mutex::new(Some(handle)),
        })
    }

    /// Send DISCONNECT and stop the event loop.
    pub async fn shutdown(&self) {
        if let Err(e) = self.client.disconnect().await {
            debug!(error = %e, "MQTT disconnect request failed");
        }
        let handle = self.event_loop.lock().take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                handle.abort();
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        info!("Disconnected from MQTT broker");
    }
}

async fn wait_for_connack(event_loop: &mut EventLoop, broker: &str) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return,
            Ok(_) => {}
            Err(e) => {
                warn!(broker = %broker, error = %e, "MQTT connection attempt failed, retrying");
                tokio::time::sleep(CONNECT_RETRY).await;
            }
        }
    }
}

async fn run_event_loop(mut event_loop: EventLoop, connected: Arc<AtomicBool>) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                if !connected.swap(true, Ordering::SeqCst) {
                    info!("Reconnected to MQTT broker");
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::SeqCst);
                warn!("MQTT broker closed the session");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.store(false, Ordering::SeqCst);
                debug!("MQTT event loop stopping after DISCONNECT");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                if connected.swap(false, Ordering::SeqCst) {
                    warn!(error = %e, "MQTT connection lost");
                }
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        }
    }
}

fn to_mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

/// Publish topics must be non-empty and free of wildcards and NUL.
fn check_topic(topic: &str) -> Result<(), PublishError> {
    if topic.is_empty() {
        return Err(PublishError::Rejected("topic is empty".to_string()));
    }
    if topic.contains(['+', '#', '\0']) {
        return Err(PublishError::Rejected(format!(
            "topic '{topic}' contains a wildcard or NUL character"
        )));
    }
    Ok(())
}

#[async_trait]
impl PublishGateway for MqttGateway {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn publish(&self, topic: &str, payload: &str, qos: QoS, retain: bool) -> PublishResult {
        if !self.is_connected() {
            return Err(PublishError::BrokerUnavailable(
                "not connected to MQTT broker".to_string(),
            ));
        }
        check_topic(topic)?;
        if payload.len() > self.max_packet_size {
            return Err(PublishError::Serialization(format!(
                "payload of {} bytes exceeds the {} byte packet limit",
                payload.len(),
                self.max_packet_size
            )));
        }

        self.client
            .publish(topic, to_mqtt_qos(qos), retain, payload.as_bytes().to_vec())
            .await
            .map_err(|e| PublishError::BrokerUnavailable(e.to_string()))?;

        debug!(topic = %topic, qos = qos.as_u8(), retain, "Handed message to MQTT client");
        Ok(PublishReceipt {
            topic: topic.to_string(),
            qos,
            retain,
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_configuration() {
        let config = MqttConfig::new("broker.local").with_credentials("user", "pw");
        let options = MqttGateway::options(&config);
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 1883));
        assert_eq!(options.client_id(), "webhook-bridge");
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert_eq!(
            options.credentials(),
            Some(("user".to_string(), "pw".to_string()))
        );
    }

    #[test]
    fn wildcard_topics_are_rejected() {
        assert!(check_topic("home/+/temp").is_err());
        assert!(check_topic("home/#").is_err());
        assert!(check_topic("").is_err());
        assert!(check_topic("home/bedroom/temp").is_ok());
    }

    #[test]
    fn qos_levels_map_one_to_one() {
        assert_eq!(to_mqtt_qos(QoS::AtMostOnce), rumqttc::QoS::AtMostOnce);
        assert_eq!(to_mqtt_qos(QoS::ExactlyOnce), rumqttc::QoS::ExactlyOnce);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_broker_fails_after_connect_timeout() {
        let mut config = MqttConfig::new("127.0.0.1");
        config.port = 1;
        config.connect_timeout_ms = 1_500;
        let result = MqttGateway::connect(&config).await;
        assert!(matches!(result, Err(PublishError::BrokerUnavailable(_))));
    }
}
