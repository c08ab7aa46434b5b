//! Node-wide event multiplexer.

use alloy_primitives::{Address, B256};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the broadcast buffer. Lagging subscribers lose older events.
const EVENT_BUFFER: usize = 256;

/// Events posted by the node's subsystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// The canonical head moved.
    ChainHead {
        /// New head number.
        number: u64,
        /// New head hash.
        hash: B256,
    },
    /// Local mining started.
    MiningStarted {
        /// Beneficiary of mined blocks.
        etherbase: Address,
    },
    /// Local mining stopped.
    MiningStopped,
}

/// Fan-out of [`NodeEvent`]s to any number of subscribers.
#[derive(Debug)]
pub struct EventMux {
    sender: broadcast::Sender<NodeEvent>,
    stopped: AtomicBool,
}

impl Default for EventMux {
    fn default() -> Self {
        Self::new()
    }
}

impl EventMux {
    /// Create a running multiplexer.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender, stopped: AtomicBool::new(false) }
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.sender.subscribe()
    }

    /// Delivers `event` to current subscribers. Dropped once stopped.
    pub fn post(&self, event: NodeEvent) {
        if self.is_stopped() {
            return;
        }
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Stops delivery.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        debug!(target: "chain::events", "Event mux stopped");
    }

    /// Whether [`EventMux::stop`] was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
