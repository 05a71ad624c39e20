//! # Murmur Ledger
//!
//! The proof-of-work ledger: a fork tree of every accepted block, the fork
//! currently adopted, the block being mined and the miner itself.
//!
//! ## Key Types
//!
//! - [`ForkTree`] - Arena of all accepted blocks, with longest-fork search
//! - [`Ledger`] - Fork tree plus adopted fork and mining template
//! - [`Miner`] - Nonce search loop over a shared [`Ledger`]
//!
//! ## Design Notes
//!
//! - **Strictly-longer adoption**: an equal-length branch never replaces
//!   the adopted fork
//! - **No pruning**: losing forks stay in the tree and may win later
//! - **Name uniqueness**: a file name is claimed at most once per fork
//! - **Bounded blocks**: a mined block carries at most [`BlockLimits`] worth
//!   of the pool, so it always fits one datagram

pub mod chain;
pub mod error;
pub mod fork_tree;
pub mod miner;

pub use chain::{Acceptance, BlockLimits, ForkChange, Ledger, BLOCK_ENVELOPE_OVERHEAD};
pub use error::{LedgerError, Result};
pub use fork_tree::ForkTree;
pub use miner::{publish_delay, search_nonce, MinedBlock, Miner, MiningConfig};

#[cfg(test)]
pub(crate) mod test_support {
    use murmur_core::{Block, BlockHash, FileRecord, Nonce, Transaction};

    /// Deterministic nonce search, so test blocks are reproducible.
    pub fn mine(prev: BlockHash, txs: Vec<Transaction>) -> Block {
        let mut template = Block::template(prev);
        template.transactions = txs;
        (0u64..)
            .map(|i| template.with_nonce(Nonce::from_counter(i)))
            .find(Block::has_valid_pow)
            .unwrap()
    }

    /// `n` chained blocks on top of `prev`, one transaction each.
    pub fn mine_chain(prev: BlockHash, n: usize, label: &str) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::with_capacity(n);
        let mut parent = prev;
        for i in 0..n {
            let block = mine(parent, vec![tx(&format!("{label}-{i}"))]);
            parent = block.hash();
            blocks.push(block);
        }
        blocks
    }

    pub fn tx(name: &str) -> Transaction {
        Transaction::new(FileRecord::new(name, 1024, vec![0xab; 32]), 10)
    }
}
