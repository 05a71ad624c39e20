//! Error types for the node.

use murmur_gossip::GossipError;
use murmur_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Gossip or transport error.
    #[error("gossip error: {0}")]
    Gossip(#[from] GossipError),

    /// Ledger rejected a block or transaction.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Ledger operations are disabled in simple mode.
    #[error("ledger is not available in simple mode")]
    SimpleMode,

    /// `start` was called twice.
    #[error("node already started")]
    AlreadyStarted,
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
