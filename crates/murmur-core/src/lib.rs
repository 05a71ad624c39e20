//! # Murmur Core
//!
//! Pure primitives for murmur: vector clocks, rumors, and the
//! proof-of-work ledger's blocks and transactions.
//!
//! This crate contains no I/O, no locking, no networking. It is pure
//! computation over the protocol's data structures.
//!
//! ## Key Types
//!
//! - [`VectorClock`] - Per-origin next-expected ids; the exactly-once gate for rumors
//! - [`Rumor`] / [`MessageLog`] - Origin-sequenced messages and their append-only log
//! - [`Block`] / [`Transaction`] - Ledger entries, hashed with SHA-256
//! - [`Sha256Hash`] - Content identifier for blocks and transactions
//!
//! ## Hashing
//!
//! Hash preimages are fixed byte layouts. See [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod rumor;
pub mod types;
pub mod validation;

pub use block::{Block, FileRecord, Transaction, POW_ZERO_BYTES};
pub use canonical::{block_hash, block_preimage, transaction_hash, transaction_preimage};
pub use clock::{ClockComparison, PeerStatus, VectorClock, FIRST_ID};
pub use crypto::{BlockHash, Sha256Hash};
pub use error::ValidationError;
pub use rumor::{MessageLog, Rumor};
pub use types::Nonce;
pub use validation::{validate_block, validate_rumor, validate_transaction};
