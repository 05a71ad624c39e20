//! Ledger data: file records, transactions and proof-of-work blocks.

use serde::{Deserialize, Serialize};

use crate::canonical::{block_hash, transaction_hash};
use crate::crypto::{BlockHash, Sha256Hash};
use crate::types::Nonce;

/// Number of leading zero bytes a block hash needs (16-bit difficulty).
pub const POW_ZERO_BYTES: usize = 2;

/// A named file published on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    /// Published name. At most one transaction per name may be confirmed
    /// on a fork.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Content hash (the metafile hash of the indexed file).
    pub metafile_hash: Vec<u8>,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, size: u64, metafile_hash: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size,
            metafile_hash,
        }
    }
}

/// A request to record a file name on the ledger.
///
/// `hop_limit` bounds flooding of the transaction and is not hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub file: FileRecord,
    pub hop_limit: u32,
}

impl Transaction {
    pub fn new(file: FileRecord, hop_limit: u32) -> Self {
        Self { file, hop_limit }
    }

    /// The file name this transaction claims.
    pub fn name(&self) -> &str {
        &self.file.name
    }

    /// SHA-256 over `len(name) || name || metafile_hash`.
    pub fn hash(&self) -> Sha256Hash {
        transaction_hash(self)
    }
}

/// A proof-of-work block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub prev_hash: BlockHash,
    pub nonce: Nonce,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// An empty template on top of `prev_hash`.
    pub fn template(prev_hash: BlockHash) -> Self {
        Self {
            prev_hash,
            nonce: Nonce::ZERO,
            transactions: Vec::new(),
        }
    }

    /// Block identity. Sensitive to transaction order.
    pub fn hash(&self) -> BlockHash {
        block_hash(self)
    }

    /// True iff the first [`POW_ZERO_BYTES`] bytes of the hash are zero.
    pub fn has_valid_pow(&self) -> bool {
        self.hash().as_bytes()[..POW_ZERO_BYTES]
            .iter()
            .all(|b| *b == 0)
    }

    /// True if any transaction in this block claims `name`.
    pub fn contains_file_name(&self, name: &str) -> bool {
        self.transactions.iter().any(|tx| tx.name() == name)
    }

    /// Same block with a different nonce.
    pub fn with_nonce(&self, nonce: Nonce) -> Self {
        Self {
            nonce,
            ..self.clone()
        }
    }
}
