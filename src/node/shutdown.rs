//! One-shot shutdown signal.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Fires once when the node has fully stopped.
///
/// Firing a second time is a lifecycle bug and panics.
#[derive(Debug)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
    fired: AtomicBool,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Create an unfired signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx, fired: AtomicBool::new(false) }
    }

    /// A receiver resolving once the signal fires.
    pub fn subscribe(&self) -> Shutdown {
        Shutdown { rx: self.tx.subscribe() }
    }

    /// Whether the signal fired.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Fires the signal.
    ///
    /// # Panics
    ///
    /// If the signal already fired.
    pub fn fire(&self) {
        assert!(!self.fired.swap(true, Ordering::AcqRel), "shutdown signal fired twice");
        self.tx.send_replace(true);
    }
}

/// Receiving side of a [`ShutdownSignal`].
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Whether the signal fired.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits for the signal. Returns immediately if it already fired.
    pub async fn wait(&mut self) {
        // A dropped sender means the node is gone, which counts as shutdown.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}
