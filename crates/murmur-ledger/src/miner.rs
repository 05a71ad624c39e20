//! Proof-of-work miner.
//!
//! The miner loops forever over the ledger's mining template: it copies the
//! template under the ledger lock, tries a batch of random nonces without
//! holding the lock, and on success inserts the block back into the ledger.
//! The template may go stale during a batch; a block found on a stale
//! template simply fails insertion or lands on a side branch.
//!
//! Accepted blocks are handed to a channel together with the delay after
//! which they should be announced. Publication itself is the node's job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use murmur_core::{Block, BlockHash, Nonce};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::chain::Ledger;

/// Miner configuration.
#[derive(Debug, Clone)]
pub struct MiningConfig {
    /// Whether the node runs a miner at all.
    pub enabled: bool,
    /// Nonces tried per template snapshot.
    pub batch_size: u64,
    /// Announcement delay for the very first block in the ledger.
    pub first_block_delay: Duration,
    /// Announcement delay for later blocks, as a multiple of mining time.
    pub delay_multiplier: u32,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: 4096,
            first_block_delay: Duration::from_secs(5),
            delay_multiplier: 2,
        }
    }
}

/// A block this node mined and accepted, waiting to be announced.
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub block: Block,
    pub hash: BlockHash,
    pub publish_delay: Duration,
}

/// Try up to `attempts` random nonces on `template`.
///
/// Returns the first block meeting the difficulty target.
pub fn search_nonce(template: &Block, attempts: u64) -> Option<Block> {
    (0..attempts)
        .map(|_| template.with_nonce(Nonce::random()))
        .find(Block::has_valid_pow)
}

/// Announcement delay for a freshly accepted block.
///
/// `first` is true when the block is the first one the ledger ever took.
pub fn publish_delay(config: &MiningConfig, first: bool, elapsed: Duration) -> Duration {
    if first {
        config.first_block_delay
    } else {
        elapsed.saturating_mul(config.delay_multiplier)
    }
}

/// Continuous nonce search against a shared ledger.
pub struct Miner {
    ledger: Arc<Mutex<Ledger>>,
    config: MiningConfig,
    found: mpsc::UnboundedSender<MinedBlock>,
    stop: Arc<AtomicBool>,
}

impl Miner {
    pub fn new(
        ledger: Arc<Mutex<Ledger>>,
        config: MiningConfig,
        found: mpsc::UnboundedSender<MinedBlock>,
    ) -> Self {
        Self {
            ledger,
            config,
            found,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that makes [`run`](Self::run) return after its current batch.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Mine until stopped or until nobody listens for found blocks.
    ///
    /// Blocking: run it on a dedicated thread.
    pub fn run(self) {
        while !self.stop.load(Ordering::Relaxed) {
            let Some(mined) = self.mine_once() else {
                continue;
            };
            if self.found.send(mined).is_err() {
                debug!("block receiver gone, miner exiting");
                return;
            }
        }
        debug!("miner stopped");
    }

    /// Search until a block is found and accepted, or the stop flag is set.
    ///
    /// A found block that the ledger rejects is discarded and the search
    /// continues against the current template.
    pub fn mine_once(&self) -> Option<MinedBlock> {
        let start = Instant::now();
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return None;
            }

            let template = self.ledger.lock().unwrap().mining_template();
            let Some(block) = search_nonce(&template, self.config.batch_size) else {
                continue;
            };
            let hash = block.hash();
            info!(block = %hash, "found block");

            let first = {
                let mut ledger = self.ledger.lock().unwrap();
                if !ledger.accept_block(block.clone()) {
                    continue;
                }
                ledger.block_count() == 1
            };

            let elapsed = start.elapsed();
            return Some(MinedBlock {
                block,
                hash,
                publish_delay: publish_delay(&self.config, first, elapsed),
            });
        }
    }
}
