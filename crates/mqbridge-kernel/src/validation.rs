//! Bridge configuration container and load-time validation.
//!
//! [`BridgeConfig`] aggregates the routes document: api version prefix,
//! server binding, authentication keys, broker connection and route list.
//! [`validate()`](BridgeConfig::validate) checks every structural invariant
//! *before* any runtime resources (sockets, broker sessions) are allocated.

use crate::error::ConfigError;
use crate::route::RouteDefinition;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// MqttConfig
// ─────────────────────────────────────────────────────────────────────────────

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "webhook-bridge".to_string()
}

fn default_keepalive() -> u64 {
    60
}

fn default_publish_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_max_packet_size() -> usize {
    256 * 1024
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub broker: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive: u64,
    /// Upper bound on a single publish call.
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
    /// Upper bound on waiting for the initial CONNACK.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Largest packet the client will send or accept, in bytes.
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
}

impl MqttConfig {
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            port: default_mqtt_port(),
            username: None,
            password: None,
            client_id: default_client_id(),
            keepalive: default_keepalive(),
            publish_timeout_ms: default_publish_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_packet_size: default_max_packet_size(),
        }
    }

    /// Builder: set username/password credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.trim().is_empty() {
            return Err(ConfigError::EmptyBrokerHost);
        }
        if self.keepalive < 5 {
            return Err(ConfigError::InvalidKeepAlive(self.keepalive));
        }
        if self.publish_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("mqtt.publish_timeout_ms".to_string()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("mqtt.connect_timeout_ms".to_string()));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ServerConfig / AuthConfig
// ─────────────────────────────────────────────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
        }
    }
}

/// API keys accepted on bridged routes. When empty, authentication is
/// disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// BridgeConfig
// ─────────────────────────────────────────────────────────────────────────────

fn default_api_version() -> String {
    "v1".to_string()
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Prefix of every compiled route path (`/{api_version}/...`).
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
}

impl BridgeConfig {
    /// Construct a config with default server/auth settings and no routes.
    pub fn new(mqtt: MqttConfig) -> Self {
        Self {
            api_version: default_api_version(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            mqtt,
            routes: Vec::new(),
        }
    }

    /// Builder: add a route.
    pub fn with_route(mut self, route: RouteDefinition) -> Self {
        self.routes.push(route);
        self
    }

    /// Builder: set the api_version prefix.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Builder: add an accepted API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.auth.api_keys.push(key.into());
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate the document-level invariants and every route definition.
    ///
    /// Returns the *first* detected [`ConfigError`]. Cross-route checks
    /// (collisions, template references) happen in the route compiler.
    ///
    /// Checks performed (in order):
    /// 1. `api_version` contains no `/`.
    /// 2. The mqtt section has a broker host, keepalive >= 5 s and non-zero
    ///    timeouts.
    /// 3. Each route passes [`RouteDefinition::validate()`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version.contains('/') {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }

        self.mqtt.validate()?;

        for route in &self.routes {
            route.validate()?;
        }

        Ok(())
    }

    /// Path prefix derived from `api_version` (empty when unset).
    pub fn path_prefix(&self) -> String {
        let version = self.api_version.trim();
        if version.is_empty() {
            String::new()
        } else {
            format!("/{version}")
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
