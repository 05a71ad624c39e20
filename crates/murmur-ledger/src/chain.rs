//! The ledger: fork tree, adopted fork and the block being mined.
//!
//! `Ledger` is deliberately not internally synchronized. The node keeps it
//! behind one coarse mutex because block acceptance, transaction admission
//! and mining-template reads all touch the fork tree and the mining block
//! together. The nonce search runs on a copy of the template, outside the
//! lock.

use murmur_core::{validate_transaction, Block, BlockHash, Transaction};
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::fork_tree::ForkTree;

/// What an accepted block did to the adopted fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkChange {
    /// The block extended the adopted fork (or started the chain).
    Extended,
    /// A longer fork replaced the adopted one; `rewind` blocks were abandoned.
    Reorganized { rewind: usize },
    /// The block landed on a fork that is not longer than the adopted one.
    SideBranch,
}

/// Result of accepting a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acceptance {
    pub hash: BlockHash,
    pub change: ForkChange,
}

/// Room reserved in a block datagram for everything but the transactions:
/// envelope tag, field names, both hashes and the hop limit.
pub const BLOCK_ENVELOPE_OVERHEAD: usize = 1024;

/// Bounds on what one mined block may carry.
///
/// Pending transactions beyond these bounds stay in the pool and are mined
/// into a later block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLimits {
    /// Most transactions in one block.
    pub max_transactions: usize,
    /// Budget for the CBOR encoding of one block's transactions.
    pub max_transaction_bytes: usize,
}

impl Default for BlockLimits {
    fn default() -> Self {
        Self {
            max_transactions: 1024,
            max_transaction_bytes: 65_535 - BLOCK_ENVELOPE_OVERHEAD,
        }
    }
}

/// Fork tree plus the node's view of the chain.
#[derive(Debug)]
pub struct Ledger {
    tree: ForkTree,
    /// Hashes of the adopted fork, genesis first.
    current_route: Vec<BlockHash>,
    /// Blocks of the adopted fork, genesis first.
    current_fork: Vec<Block>,
    /// Pending block: always on top of the adopted tip, and never holding a
    /// transaction already confirmed on the adopted fork. Its transactions
    /// are the pool; the miner takes a prefix within `limits`.
    mining_block: Block,
    limits: BlockLimits,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create an empty ledger. The first template mines on the zero hash.
    pub fn new() -> Self {
        Self::with_limits(BlockLimits::default())
    }

    pub fn with_limits(limits: BlockLimits) -> Self {
        Self {
            tree: ForkTree::new(),
            current_route: Vec::new(),
            current_fork: Vec::new(),
            mining_block: Block::template(BlockHash::ZERO),
            limits,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Block acceptance
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a block and re-evaluate which fork to follow.
    ///
    /// On success the block is in the fork tree. If its fork is now strictly
    /// longer than the adopted one, that fork is adopted. Either way the
    /// mining template is repointed at the adopted tip and its pool drops
    /// every transaction whose file name is confirmed on the adopted fork.
    pub fn insert_block(&mut self, block: Block) -> Result<Acceptance> {
        let hash = self.tree.insert(block)?;

        let longest = self.tree.longest_fork();
        let change = if longest.len() > self.current_route.len() {
            let rewind = rewind_depth(&self.current_route, &longest);
            if rewind > 0 {
                info!(rewind, "fork-longer: abandoning blocks");
            }
            self.current_fork = self.tree.blocks_on(&longest);
            self.current_route = longest;
            if rewind > 0 {
                ForkChange::Reorganized { rewind }
            } else {
                ForkChange::Extended
            }
        } else {
            debug!(block = %hash, "fork-shorter: block not on adopted fork");
            ForkChange::SideBranch
        };

        if let Some(tip) = self.current_route.last() {
            self.mining_block.prev_hash = *tip;
        }

        let tree = &self.tree;
        let route = &self.current_route;
        self.mining_block
            .transactions
            .retain(|tx| !tree.file_name_on_route(tx.name(), route));

        if change != ForkChange::SideBranch {
            info!(
                length = self.current_route.len(),
                tip = %self.mining_block.prev_hash,
                "chain updated"
            );
        }

        Ok(Acceptance { hash, change })
    }

    /// Boolean form of [`insert_block`](Self::insert_block).
    pub fn accept_block(&mut self, block: Block) -> bool {
        match self.insert_block(block) {
            Ok(_) => true,
            Err(e) => {
                debug!("block rejected: {}", e);
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction admission
    // ─────────────────────────────────────────────────────────────────────────

    /// Queue a transaction for mining.
    ///
    /// Rejected if a transaction with the same file name is already queued
    /// or already confirmed anywhere on the adopted fork, or if it could
    /// never fit in a block on its own.
    pub fn admit_transaction(&mut self, tx: Transaction) -> Result<()> {
        validate_transaction(&tx).map_err(|e| LedgerError::InvalidTransaction(e.to_string()))?;

        let size = encoded_len(&tx);
        if size > self.limits.max_transaction_bytes {
            return Err(LedgerError::OversizedTransaction {
                name: tx.name().to_string(),
                size,
                max: self.limits.max_transaction_bytes,
            });
        }

        let name = tx.name();
        if self.mining_block.contains_file_name(name) {
            return Err(LedgerError::DuplicateTransaction(name.to_string()));
        }
        if self.is_confirmed(name) {
            return Err(LedgerError::AlreadyConfirmed(name.to_string()));
        }

        self.mining_block.transactions.push(tx);
        Ok(())
    }

    /// Boolean form of [`admit_transaction`](Self::admit_transaction).
    pub fn accept_transaction(&mut self, tx: Transaction) -> bool {
        match self.admit_transaction(tx) {
            Ok(()) => true,
            Err(e) => {
                debug!("transaction rejected: {}", e);
                false
            }
        }
    }

    /// True if `name` is claimed by a block on the adopted fork.
    pub fn is_confirmed(&self, name: &str) -> bool {
        self.tree.file_name_on_route(name, &self.current_route)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Recompute the globally longest fork (genesis first).
    pub fn longest_fork(&self) -> Vec<BlockHash> {
        self.tree.longest_fork()
    }

    /// The adopted fork, genesis first.
    pub fn current_fork(&self) -> &[Block] {
        &self.current_fork
    }

    /// Hashes of the adopted fork, genesis first.
    pub fn current_route(&self) -> &[BlockHash] {
        &self.current_route
    }

    /// Hash of the adopted tip.
    pub fn tip(&self) -> Option<BlockHash> {
        self.current_route.last().copied()
    }

    /// The pending block, with every queued transaction.
    pub fn mining_block(&self) -> &Block {
        &self.mining_block
    }

    /// A copy of the mining template for an unlocked nonce search.
    ///
    /// Holds the oldest pending transactions that fit within the block
    /// limits; the rest wait for a later block.
    pub fn mining_template(&self) -> Block {
        let mut template = Block::template(self.mining_block.prev_hash);
        let mut bytes = 0usize;
        for tx in &self.mining_block.transactions {
            if template.transactions.len() >= self.limits.max_transactions {
                break;
            }
            bytes = bytes.saturating_add(encoded_len(tx));
            if bytes > self.limits.max_transaction_bytes {
                break;
            }
            template.transactions.push(tx.clone());
        }
        template
    }

    pub fn limits(&self) -> BlockLimits {
        self.limits
    }

    /// Number of blocks in the fork tree, all forks included.
    pub fn block_count(&self) -> usize {
        self.tree.len()
    }

    pub fn fork_tree(&self) -> &ForkTree {
        &self.tree
    }
}

/// Size of a transaction inside an encoded block.
fn encoded_len(tx: &Transaction) -> usize {
    let mut buf = Vec::new();
    match ciborium::into_writer(tx, &mut buf) {
        Ok(()) => buf.len(),
        Err(_) => usize::MAX,
    }
}

/// Number of blocks of `old` that are not on `new`.
fn rewind_depth(old: &[BlockHash], new: &[BlockHash]) -> usize {
    let common = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    old.len() - common
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mine, mine_chain, tx};

    #[test]
    fn test_rewind_depth() {
        let h = |b: u8| BlockHash::from_bytes([b; 32]);
        assert_eq!(rewind_depth(&[h(1), h(2)], &[h(1), h(2), h(3)]), 0);
        assert_eq!(rewind_depth(&[h(1), h(2), h(3)], &[h(1), h(4), h(5), h(6)]), 2);
        assert_eq!(rewind_depth(&[], &[h(1)]), 0);
    }

    #[test]
    fn test_two_block_chain() {
        let mut ledger = Ledger::new();
        let b1 = mine(BlockHash::ZERO, vec![]);
        let b2 = mine(b1.hash(), vec![]);

        assert!(ledger.accept_block(b1.clone()));
        assert!(ledger.accept_block(b2.clone()));
        assert_eq!(ledger.current_fork(), &[b1, b2.clone()]);
        assert_eq!(ledger.mining_block().prev_hash, b2.hash());
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let mut ledger = Ledger::new();
        let b1 = mine(BlockHash::ZERO, vec![]);
        ledger.insert_block(b1.clone()).unwrap();

        let orphan = mine(BlockHash::from_bytes([3; 32]), vec![]);
        assert_eq!(
            ledger.insert_block(orphan.clone()),
            Err(LedgerError::UnknownParent(orphan.prev_hash))
        );
        assert_eq!(ledger.block_count(), 1);
        assert_eq!(ledger.current_fork(), &[b1.clone()]);
        assert_eq!(ledger.mining_block().prev_hash, b1.hash());
    }

    #[test]
    fn test_reorg_to_longer_fork_frees_transactions() {
        let mut ledger = Ledger::new();
        let genesis = mine(BlockHash::ZERO, vec![]);
        let g = ledger.insert_block(genesis).unwrap().hash;

        // Three-block fork confirming "only-short".
        let mut short = mine_chain(g, 2, "short");
        short.push(mine(short[1].hash(), vec![tx("only-short")]));
        for b in &short {
            ledger.insert_block(b.clone()).unwrap();
        }
        assert_eq!(ledger.current_route().len(), 4);
        assert!(ledger.is_confirmed("only-short"));
        assert!(!ledger.accept_transaction(tx("only-short")));

        // Five-block fork from the same genesis.
        let long = mine_chain(g, 5, "long");
        let mut changes = Vec::new();
        for b in &long {
            changes.push(ledger.insert_block(b.clone()).unwrap().change);
        }
        assert_eq!(changes[0], ForkChange::SideBranch);
        assert_eq!(changes[3], ForkChange::Reorganized { rewind: 3 });
        assert_eq!(changes[4], ForkChange::Extended);

        let expected: Vec<BlockHash> = std::iter::once(g)
            .chain(long.iter().map(|b| b.hash()))
            .collect();
        assert_eq!(ledger.longest_fork(), expected);
        assert_eq!(ledger.current_route(), expected.as_slice());
        assert_eq!(ledger.tip(), Some(long[4].hash()));

        // Confirmed only on the abandoned fork: eligible again.
        assert!(!ledger.is_confirmed("only-short"));
        assert!(ledger.accept_transaction(tx("only-short")));
    }

    #[test]
    fn test_equal_length_branch_is_not_adopted() {
        let mut ledger = Ledger::new();
        let g = ledger.insert_block(mine(BlockHash::ZERO, vec![])).unwrap().hash;
        let a = ledger.insert_block(mine(g, vec![tx("a")])).unwrap();
        let b = ledger.insert_block(mine(g, vec![tx("b")])).unwrap();

        assert_eq!(a.change, ForkChange::Extended);
        assert_eq!(b.change, ForkChange::SideBranch);
        assert_eq!(ledger.tip(), Some(a.hash));
    }

    #[test]
    fn test_admission_rules() {
        let mut ledger = Ledger::new();
        assert!(ledger.accept_transaction(tx("f1")));
        assert_eq!(
            ledger.admit_transaction(tx("f1")),
            Err(LedgerError::DuplicateTransaction("f1".into()))
        );

        let g = mine(BlockHash::ZERO, vec![tx("f2")]);
        ledger.insert_block(g).unwrap();
        assert_eq!(
            ledger.admit_transaction(tx("f2")),
            Err(LedgerError::AlreadyConfirmed("f2".into()))
        );
        assert!(matches!(
            ledger.admit_transaction(tx("")),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_confirmed_transactions_leave_the_pool() {
        let mut ledger = Ledger::new();
        ledger.accept_transaction(tx("keep"));
        ledger.accept_transaction(tx("mined"));

        ledger.insert_block(mine(BlockHash::ZERO, vec![tx("mined")])).unwrap();

        let names: Vec<&str> = ledger
            .mining_block()
            .transactions
            .iter()
            .map(|t| t.name())
            .collect();
        assert_eq!(names, vec!["keep"]);
    }

    #[test]
    fn test_side_branch_keeps_template_on_adopted_tip() {
        let mut ledger = Ledger::new();
        let g = ledger.insert_block(mine(BlockHash::ZERO, vec![])).unwrap().hash;
        let a = ledger.insert_block(mine(g, vec![tx("a")])).unwrap();
        ledger.accept_transaction(tx("pending"));

        let side = ledger.insert_block(mine(g, vec![tx("pending")])).unwrap();
        assert_eq!(side.change, ForkChange::SideBranch);
        assert_eq!(ledger.tip(), Some(a.hash));
        assert_eq!(ledger.mining_block().prev_hash, a.hash);
        // Confirmed only on the side branch: still pending here.
        assert!(ledger.mining_block().contains_file_name("pending"));
    }

    #[test]
    fn test_template_stops_at_transaction_cap() {
        let mut ledger = Ledger::with_limits(BlockLimits {
            max_transactions: 3,
            max_transaction_bytes: usize::MAX,
        });
        for i in 0..5 {
            assert!(ledger.accept_transaction(tx(&format!("f{i}"))));
        }

        let template = ledger.mining_template();
        let names: Vec<&str> = template.transactions.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["f0", "f1", "f2"]);
        assert_eq!(ledger.mining_block().transactions.len(), 5);

        // The overflow is mined into the next block.
        let first = mine(template.prev_hash, template.transactions);
        ledger.insert_block(first).unwrap();
        let next = ledger.mining_template();
        let names: Vec<&str> = next.transactions.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["f3", "f4"]);
    }

    #[test]
    fn test_template_stops_at_byte_budget() {
        let size = encoded_len(&tx("f0"));
        let mut ledger = Ledger::with_limits(BlockLimits {
            max_transactions: 1024,
            max_transaction_bytes: 2 * size + size / 2,
        });
        for i in 0..4 {
            assert!(ledger.accept_transaction(tx(&format!("f{i}"))));
        }
        assert_eq!(ledger.mining_template().transactions.len(), 2);
    }

    #[test]
    fn test_oversized_transaction_is_rejected() {
        let mut ledger = Ledger::with_limits(BlockLimits {
            max_transactions: 1024,
            max_transaction_bytes: 64,
        });
        let big = tx("big.iso");
        let size = encoded_len(&big);
        assert!(size > 64);
        assert_eq!(
            ledger.admit_transaction(big),
            Err(LedgerError::OversizedTransaction {
                name: "big.iso".into(),
                size,
                max: 64,
            })
        );
        assert!(ledger.mining_block().transactions.is_empty());
    }

    #[test]
    fn test_full_pool_template_fits_one_datagram() {
        let mut ledger = Ledger::new();
        for i in 0..1500 {
            assert!(ledger.accept_transaction(tx(&format!("file-{i:04}"))));
        }

        let template = ledger.mining_template();
        assert!(!template.transactions.is_empty());
        assert!(template.transactions.len() < 1500);
        assert!(template.transactions.len() <= ledger.limits().max_transactions);

        let mut encoded = Vec::new();
        ciborium::into_writer(&template, &mut encoded).unwrap();
        // Block framing is a few hundred bytes; the envelope adds less.
        assert!(encoded.len() <= 65_535 - 512);
    }

    mod fork_choice {
        use super::*;
        use proptest::prelude::*;
        use std::sync::OnceLock;

        /// Genesis, then three branches: 3 blocks on genesis, 2 on the first
        /// of those, 4 on genesis. The last is the one longest fork.
        fn blocks() -> &'static [Block] {
            static BLOCKS: OnceLock<Vec<Block>> = OnceLock::new();
            BLOCKS.get_or_init(|| {
                let genesis = mine(BlockHash::ZERO, vec![]);
                let a = mine_chain(genesis.hash(), 3, "a");
                let b = mine_chain(a[0].hash(), 2, "b");
                let c = mine_chain(genesis.hash(), 4, "c");
                std::iter::once(genesis).chain(a).chain(b).chain(c).collect()
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn test_adopted_fork_is_a_longest_fork_in_any_order(
                order in Just((0..10).collect::<Vec<usize>>()).prop_shuffle()
            ) {
                let blocks = blocks();
                let mut ledger = Ledger::new();
                let mut pending = order;

                while !pending.is_empty() {
                    // Orphans are refused without touching state; retry them later.
                    let pos = pending
                        .iter()
                        .position(|&i| ledger.insert_block(blocks[i].clone()).is_ok());
                    prop_assert!(pos.is_some());
                    pending.remove(pos.unwrap());

                    prop_assert_eq!(ledger.current_route().len(), ledger.longest_fork().len());
                    let fork: Vec<BlockHash> =
                        ledger.current_fork().iter().map(Block::hash).collect();
                    prop_assert_eq!(fork.as_slice(), ledger.current_route());
                    prop_assert_eq!(Some(ledger.mining_block().prev_hash), ledger.tip());
                }

                let expected: Vec<BlockHash> = std::iter::once(&blocks[0])
                    .chain(&blocks[6..])
                    .map(Block::hash)
                    .collect();
                prop_assert_eq!(ledger.current_route(), expected.as_slice());
            }
        }
    }
}
