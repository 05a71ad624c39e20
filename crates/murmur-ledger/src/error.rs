//! Error types for the ledger.

use murmur_core::BlockHash;
use thiserror::Error;

/// Reasons a block or transaction is not taken into the ledger.
///
/// None of these are fatal: the caller drops the input and, for inbound
/// data, does not forward it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Block hash does not meet the difficulty target.
    #[error("block {0} fails proof-of-work")]
    InvalidProofOfWork(BlockHash),

    /// No block in the fork tree has the block's `prev_hash`.
    #[error("unknown parent {0}")]
    UnknownParent(BlockHash),

    /// Block is already in the fork tree.
    #[error("block {0} already in the fork tree")]
    DuplicateBlock(BlockHash),

    /// A transaction for this file name is already queued for mining.
    #[error("transaction for {0:?} already pending")]
    DuplicateTransaction(String),

    /// A transaction for this file name is already on the adopted fork.
    #[error("file name {0:?} already confirmed on the current fork")]
    AlreadyConfirmed(String),

    /// Transaction alone would overflow a block's transaction budget.
    #[error("transaction for {name:?} encodes to {size} bytes, block budget is {max}")]
    OversizedTransaction { name: String, size: usize, max: usize },

    /// Transaction failed structural validation.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
