//! In-memory [`PublishGateway`] that records every call.
//!
//! Used by tests and local dry runs. It can be switched to fail every
//! publish or to stall forever, to exercise the dispatcher's failure and
//! timeout paths.

use async_trait::async_trait;
use mqbridge_kernel::{PublishError, PublishGateway, PublishReceipt, PublishResult, QoS};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One publish call as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPublish {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retain: bool,
}

#[derive(Debug, Clone)]
enum Mode {
    Accept,
    Fail(PublishError),
    Stall,
}

pub struct RecordingGateway {
    mode: Mutex<Mode>,
    published: Mutex<Vec<RecordedPublish>>,
    attempts: AtomicUsize,
    connected: AtomicBool,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGateway {
    /// A gateway that accepts every publish.
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(Mode::Accept),
            published: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            connected: AtomicBool::new(true),
        }
    }

    /// A gateway that fails every publish with `error`.
    pub fn failing(error: PublishError) -> Self {
        let gateway = Self::new();
        *gateway.mode.lock() = Mode::Fail(error);
        gateway
    }

    /// A gateway whose publish never completes.
    pub fn stalling() -> Self {
        let gateway = Self::new();
        *gateway.mode.lock() = Mode::Stall;
        gateway
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Messages accepted so far, in arrival order.
    pub fn published(&self) -> Vec<RecordedPublish> {
        self.published.lock().clone()
    }

    /// Number of publish calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublishGateway for RecordingGateway {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, topic: &str, payload: &str, qos: QoS, retain: bool) -> PublishResult {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode.lock().clone();
        match mode {
            Mode::Accept => {
                self.published.lock().push(RecordedPublish {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                    qos,
                    retain,
                });
                Ok(PublishReceipt {
                    topic: topic.to_string(),
                    qos,
                    retain,
                })
            }
            Mode::Fail(error) => Err(error),
            Mode::Stall => std::future::pending().await,
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
