//! Error types for murmur core.

use thiserror::Error;

use crate::crypto::BlockHash;

/// Validation errors for rumors, transactions and blocks.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid sequence number: expected {expected}, got {got}")]
    InvalidSequence { expected: u32, got: u32 },

    #[error("rumor origin is empty")]
    EmptyOrigin,

    #[error("transaction file name is empty")]
    EmptyFileName,

    #[error("block {0} fails proof-of-work")]
    InvalidProofOfWork(BlockHash),
}
