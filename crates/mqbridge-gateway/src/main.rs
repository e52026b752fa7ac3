//! MQTT webhook bridge: entry point.
//!
//! Loads the routes document, connects to the broker and serves the
//! configured webhook routes until Ctrl-C or SIGTERM.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CONFIG_PATH` | `config/routes.yaml` | Routes document (YAML, TOML or JSON). |
//! | `API_KEY` | *(none)* | Extra accepted API key, appended to `auth.api_keys`. |
//! | `BRIDGE_PORT` | `server.port` | Overrides the HTTP listen port. |
//! | `RUST_LOG` | `mqbridge_gateway=info,mqbridge=info` | Log filter directives. |
//! | `LOG_FORMAT` | `text` | `json` switches to structured JSON output. |

use anyhow::Context;
use mqbridge_gateway::backend::MqttGateway;
use mqbridge_gateway::server::{BridgeServer, shutdown_signal};
use mqbridge_kernel::PublishGateway;
use mqbridge_kernel::config::load_bridge_config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/routes.yaml";
const DEFAULT_LOG_FILTER: &str = "mqbridge_gateway=info,mqbridge_kernel=info,mqbridge=info";

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "MQTT webhook bridge failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_bridge_config(&config_path)
        .with_context(|| format!("failed to load configuration from '{config_path}'"))?;

    if let Ok(key) = std::env::var("API_KEY") {
        if !key.trim().is_empty() {
            config.auth.api_keys.push(key.trim().to_string());
        }
    }
    if let Ok(port) = std::env::var("BRIDGE_PORT") {
        config.server.port = port
            .parse()
            .with_context(|| format!("BRIDGE_PORT '{port}' is not a valid port"))?;
    }

    info!(
        config = %config_path,
        routes = config.routes.len(),
        broker = %config.mqtt.broker,
        auth_enabled = !config.auth.api_keys.is_empty(),
        "Configuration loaded"
    );

    let gateway = Arc::new(
        MqttGateway::connect(&config.mqtt)
            .await
            .context("failed to connect to MQTT broker")?,
    );

    let publisher: Arc<dyn PublishGateway> = gateway.clone();
    let server = BridgeServer::new(config, publisher);
    let addr = server.bind_addr();
    let result = match TcpListener::bind(&addr).await {
        Ok(listener) => server
            .serve(listener, shutdown_signal())
            .await
            .context("bridge server failed"),
        Err(e) => Err(e).with_context(|| format!("failed to bind {addr}")),
    };

    gateway.shutdown().await;
    result
}
