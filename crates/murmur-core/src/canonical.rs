//! Canonical hash preimages for transactions and blocks.
//!
//! These layouts define block identity and proof-of-work, so they must be
//! byte-for-byte stable across nodes:
//!
//! ```text
//! tx_preimage    = u32_le(len(name)) || name || metafile_hash
//! block_preimage = prev_hash || nonce || u32_le(len(txs)) || H(tx_0) || H(tx_1) || ...
//! ```
//!
//! The transaction hop limit and file size are not part of any preimage.

use crate::block::{Block, Transaction};
use crate::crypto::Sha256Hash;

/// Preimage of a transaction hash.
pub fn transaction_preimage(tx: &Transaction) -> Vec<u8> {
    let name = tx.file.name.as_bytes();
    let mut buf = Vec::with_capacity(4 + name.len() + tx.file.metafile_hash.len());
    buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
    buf.extend_from_slice(name);
    buf.extend_from_slice(&tx.file.metafile_hash);
    buf
}

/// Preimage of a block hash. Order-sensitive in the transaction list.
pub fn block_preimage(block: &Block) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + 32 + 4 + 32 * block.transactions.len());
    buf.extend_from_slice(block.prev_hash.as_bytes());
    buf.extend_from_slice(block.nonce.as_bytes());
    buf.extend_from_slice(&(block.transactions.len() as u32).to_le_bytes());
    for tx in &block.transactions {
        buf.extend_from_slice(transaction_hash(tx).as_bytes());
    }
    buf
}

/// SHA-256 of [`transaction_preimage`].
pub fn transaction_hash(tx: &Transaction) -> Sha256Hash {
    Sha256Hash::hash(&transaction_preimage(tx))
}

/// SHA-256 of [`block_preimage`].
pub fn block_hash(block: &Block) -> Sha256Hash {
    Sha256Hash::hash(&block_preimage(block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::FileRecord;
    use crate::types::Nonce;

    #[test]
    fn test_transaction_preimage_layout() {
        let tx = Transaction::new(FileRecord::new("ab", 7, vec![0xee, 0xff]), 10);
        assert_eq!(
            transaction_preimage(&tx),
            vec![2, 0, 0, 0, b'a', b'b', 0xee, 0xff]
        );
    }

    #[test]
    fn test_hop_limit_not_hashed() {
        let a = Transaction::new(FileRecord::new("f", 1, vec![1]), 10);
        let mut b = a.clone();
        b.hop_limit = 3;
        b.file.size = 99;
        assert_eq!(transaction_hash(&a), transaction_hash(&b));
    }

    #[test]
    fn test_empty_block_preimage_layout() {
        let block = Block {
            prev_hash: Sha256Hash::from_bytes([1; 32]),
            nonce: Nonce::from_bytes([2; 32]),
            transactions: vec![],
        };
        let pre = block_preimage(&block);
        assert_eq!(pre.len(), 68);
        assert_eq!(&pre[..32], &[1u8; 32]);
        assert_eq!(&pre[32..64], &[2u8; 32]);
        assert_eq!(&pre[64..], &[0, 0, 0, 0]);
    }
}
