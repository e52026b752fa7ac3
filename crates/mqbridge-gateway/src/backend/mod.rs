//! Publish gateway implementations.

mod memory;
mod mqtt;

pub use memory::{RecordedPublish, RecordingGateway};
pub use mqtt::MqttGateway;
