//! Bloom bit retrieval servicing.
//!
//! Log filters request bloom bit vectors through a shared queue. A fixed set
//! of handler tasks answer from the bloom indexer until the node shuts down.

use super::Shutdown;
use crate::chain::BloomIndexer;
use alloy_primitives::Bytes;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tracing::trace;

/// Number of handler tasks answering bloom bit requests.
pub const BLOOM_SERVICE_THREADS: usize = 16;

/// Capacity of the retrieval queue.
pub const BLOOM_RETRIEVAL_QUEUE: usize = 64;

/// A request for one bloom bit across several sections.
#[derive(Debug)]
pub struct BloomRetrieval {
    /// Bloom bit index.
    pub bit: u32,
    /// Sections to read.
    pub sections: Vec<u64>,
    /// Receives one vector per section, `None` where not indexed yet.
    pub result: oneshot::Sender<Vec<Option<Bytes>>>,
}

/// Spawns [`BLOOM_SERVICE_THREADS`] handlers sharing `requests`.
pub(crate) fn start_bloom_handlers(
    indexer: Arc<dyn BloomIndexer>,
    requests: Arc<Mutex<mpsc::Receiver<BloomRetrieval>>>,
    shutdown: Shutdown,
) -> Vec<JoinHandle<()>> {
    (0..BLOOM_SERVICE_THREADS)
        .map(|id| {
            let indexer = indexer.clone();
            let requests = requests.clone();
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let request = tokio::select! {
                        _ = shutdown.wait() => break,
                        request = async { requests.lock().await.recv().await } => request,
                    };
                    let Some(request) = request else { break };

                    let bits = request
                        .sections
                        .iter()
                        .map(|section| indexer.bloom_bits(request.bit, *section))
                        .collect();
                    trace!(target: "chain::bloom", handler = id, bit = request.bit, "Served bloom bits");
                    // The requester may have given up.
                    let _ = request.result.send(bits);
                }
            })
        })
        .collect()
}
