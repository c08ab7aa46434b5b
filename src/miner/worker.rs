//! Miner Worker Module
//!
//! The worker owns the mining loop. The node drives it through a
//! [`MinerHandle`]; every call is forwarded as a [`MinerCommand`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Worker::run()                         │
//! │                                                          │
//! │  ┌─────────────┐            ┌────────────────┐           │
//! │  │ cmd_rx      │            │ recommit_timer │           │
//! │  │ (commands)  │            │ (new work)     │           │
//! │  └──────┬──────┘            └───────┬────────┘           │
//! │         └──────────────┬────────────┘                    │
//! │                        ↓                                 │
//! │  ┌──────────────────────────────────────────────┐        │
//! │  │ tokio::select! {                             │        │
//! │  │   cmd => handle_command(),                   │        │
//! │  │   recommit_tick => commit_work(),            │        │
//! │  │ }                                            │        │
//! │  └──────────────────────────────────────────────┘        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Workflow
//!
//! 1. Receive `Start` with the beneficiary
//! 2. On every recommit tick, prepare work on top of the chain head
//! 3. Clique seals the header with the authorized signer; ethash publishes
//!    the epoch seed for external sealers
//! 4. `Stop` parks the loop until the next `Start`

use super::{
    config::{MinerConfig, MAXIMUM_EXTRA_DATA_SIZE},
    error::{MinerError, MinerResult},
    Miner,
};
use crate::{
    chain::{BlockChain, EventMux, NodeEvent},
    consensus::{clique::HeaderData, clique::EXTRA_SEAL, clique::EXTRA_VANITY, Engine},
};
use alloy_primitives::{Address, Bytes, B256};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::{sync::mpsc, time::interval};
use tracing::{debug, info, warn};

/// Clique difficulty for in-turn blocks.
const DIFF_IN_TURN: u64 = 2;

/// Commands sent to the miner worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinerCommand {
    /// Start mining for the given beneficiary.
    Start(Address),

    /// Stop current mining operation.
    Stop,

    /// Change the beneficiary.
    SetEtherbase(Address),

    /// Change the header extra-data.
    SetExtra(Bytes),

    /// Trigger manual recommit.
    Recommit,
}

/// Events emitted by the miner worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinerEvent {
    /// Mining has started.
    MiningStarted {
        /// Beneficiary of mined blocks.
        etherbase: Address,
    },

    /// Mining was stopped.
    MiningStopped,

    /// Work for an external ethash sealer is ready.
    WorkPrepared {
        /// Number of the block being mined.
        number: u64,
        /// Epoch seed hash.
        seed: B256,
    },

    /// A header was sealed by the clique signer.
    BlockSealed {
        /// Number of the sealed header.
        number: u64,
        /// Hash covered by the seal.
        seal_hash: B256,
        /// Sealer address.
        signer: Address,
    },

    /// Error occurred during mining.
    Error(String),
}

/// Handle for sending commands to the miner worker.
#[derive(Debug, Clone)]
pub struct MinerHandle {
    cmd_tx: mpsc::UnboundedSender<MinerCommand>,
    mining: Arc<AtomicBool>,
}

impl MinerHandle {
    fn send(&self, command: MinerCommand) -> MinerResult<()> {
        self.cmd_tx.send(command).map_err(|e| MinerError::ChannelError(e.to_string()))
    }

    /// Trigger manual recommit.
    pub fn recommit(&self) -> MinerResult<()> {
        self.send(MinerCommand::Recommit)
    }
}

impl Miner for MinerHandle {
    fn start(&self, etherbase: Address) {
        self.mining.store(true, Ordering::Release);
        if let Err(err) = self.send(MinerCommand::Start(etherbase)) {
            self.mining.store(false, Ordering::Release);
            warn!(target: "miner::worker", %err, "Failed to start miner");
        }
    }

    fn stop(&self) {
        self.mining.store(false, Ordering::Release);
        // A dropped worker is already stopped.
        let _ = self.send(MinerCommand::Stop);
    }

    fn mining(&self) -> bool {
        self.mining.load(Ordering::Acquire)
    }

    fn set_etherbase(&self, etherbase: Address) {
        let _ = self.send(MinerCommand::SetEtherbase(etherbase));
    }

    fn set_extra(&self, extra: Bytes) -> MinerResult<()> {
        if extra.len() > MAXIMUM_EXTRA_DATA_SIZE {
            return Err(MinerError::ExtraTooLong { len: extra.len() });
        }
        self.send(MinerCommand::SetExtra(extra))
    }
}

/// Miner worker that runs the main mining loop.
pub struct Worker {
    /// Miner configuration.
    config: MinerConfig,

    /// Consensus engine used for sealing.
    engine: Engine,

    /// Chain providing the parent of new work.
    chain: Arc<dyn BlockChain>,

    /// Node event multiplexer.
    events: Arc<EventMux>,

    /// Whether work is being produced.
    running: bool,

    /// Command receiver.
    cmd_rx: mpsc::UnboundedReceiver<MinerCommand>,

    /// Event sender.
    event_tx: mpsc::Sender<MinerEvent>,
}

impl Worker {
    /// Create a new miner worker and return its handle.
    pub fn new(
        config: MinerConfig,
        engine: Engine,
        chain: Arc<dyn BlockChain>,
        events: Arc<EventMux>,
    ) -> (MinerHandle, mpsc::Receiver<MinerEvent>, Self) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(16);

        let worker =
            Self { config, engine, chain, events, running: false, cmd_rx, event_tx };
        let handle = MinerHandle { cmd_tx, mining: Arc::new(AtomicBool::new(false)) };
        (handle, event_rx, worker)
    }

    /// Spawn the worker as a background task.
    pub fn spawn(
        config: MinerConfig,
        engine: Engine,
        chain: Arc<dyn BlockChain>,
        events: Arc<EventMux>,
    ) -> (MinerHandle, mpsc::Receiver<MinerEvent>) {
        let (handle, event_rx, worker) = Self::new(config, engine, chain, events);

        tokio::spawn(async move {
            worker.run().await;
        });

        (handle, event_rx)
    }

    /// Run the main mining loop until every handle is dropped.
    pub async fn run(mut self) {
        let mut recommit_interval = interval(self.config.recommit_interval);
        recommit_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    self.handle_command(cmd).await;
                }

                _ = recommit_interval.tick(), if self.running => {
                    self.commit_work().await;
                }
            }
        }
        debug!(target: "miner::worker", "Miner worker exited");
    }

    async fn handle_command(&mut self, cmd: MinerCommand) {
        match cmd {
            MinerCommand::Start(etherbase) => {
                self.config.etherbase = etherbase;
                self.running = true;
                info!(target: "miner::worker", %etherbase, "Starting mining operation");
                self.events.post(NodeEvent::MiningStarted { etherbase });
                self.emit(MinerEvent::MiningStarted { etherbase }).await;
            }
            MinerCommand::Stop => {
                if std::mem::take(&mut self.running) {
                    info!(target: "miner::worker", "Mining stopped");
                    self.events.post(NodeEvent::MiningStopped);
                    self.emit(MinerEvent::MiningStopped).await;
                }
            }
            MinerCommand::SetEtherbase(etherbase) => {
                self.config.etherbase = etherbase;
            }
            MinerCommand::SetExtra(extra) => {
                self.config.extra_data = extra;
            }
            MinerCommand::Recommit => {
                if self.running {
                    self.commit_work().await;
                }
            }
        }
    }

    /// Prepares work on top of the current head.
    async fn commit_work(&mut self) {
        let parent = self.chain.head();
        let number = parent.number + 1;

        let event = match &self.engine {
            Engine::Ethash(ethash) => {
                MinerEvent::WorkPrepared { number, seed: ethash.seed_hash(number) }
            }
            Engine::Clique(clique) => {
                let mut extra = vec![0u8; EXTRA_VANITY];
                let vanity = self.config.extra_data.len().min(EXTRA_VANITY);
                extra[..vanity].copy_from_slice(&self.config.extra_data[..vanity]);
                extra.extend_from_slice(&[0u8; EXTRA_SEAL]);

                let mut header = HeaderData {
                    number,
                    parent_hash: parent.hash,
                    coinbase: self.config.etherbase,
                    nonce: [0u8; 8],
                    extra: extra.into(),
                    time: unix_now(),
                    difficulty: DIFF_IN_TURN,
                };
                match clique.seal(&mut header) {
                    Ok(()) => MinerEvent::BlockSealed {
                        number,
                        seal_hash: header.seal_hash(),
                        signer: clique.signer().unwrap_or_default(),
                    },
                    Err(err) => {
                        warn!(target: "miner::worker", number, %err, "Failed to seal block");
                        MinerEvent::Error(MinerError::from(err).to_string())
                    }
                }
            }
        };
        debug!(target: "miner::worker", number, engine = self.engine.name(), "Committed new work");
        self.emit(event).await;
    }

    async fn emit(&self, event: MinerEvent) {
        // Nobody listening is fine.
        let _ = self.event_tx.send(event).await;
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
