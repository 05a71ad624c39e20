//! Golden test vectors for deterministic verification.
//!
//! Transaction and block hashes decide block identity and proof-of-work, so
//! every node must compute them identically. These vectors pin the byte
//! layout of both preimages.

use murmur_core::{Block, BlockHash, FileRecord, Nonce, Transaction};

/// A transaction hash vector.
#[derive(Debug, Clone)]
pub struct TransactionVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub file_name: &'static str,
    pub metafile_hash: &'static [u8],
    /// Expected SHA-256 (hex).
    pub expected_hash: &'static str,
}

impl TransactionVector {
    /// The transaction this vector describes. Size and hop limit are
    /// arbitrary: neither is hashed.
    pub fn transaction(&self) -> Transaction {
        Transaction::new(
            FileRecord::new(self.file_name, 1024, self.metafile_hash.to_vec()),
            10,
        )
    }
}

/// A block hash vector.
#[derive(Debug, Clone)]
pub struct BlockVector {
    pub name: &'static str,
    pub prev_hash: [u8; 32],
    pub nonce: [u8; 32],
    /// Indices into [`transaction_vectors`].
    pub transactions: &'static [usize],
    pub expected_hash: &'static str,
}

impl BlockVector {
    pub fn block(&self) -> Block {
        let txs = transaction_vectors();
        Block {
            prev_hash: BlockHash::from_bytes(self.prev_hash),
            nonce: Nonce::from_bytes(self.nonce),
            transactions: self
                .transactions
                .iter()
                .map(|i| txs[*i].transaction())
                .collect(),
        }
    }
}

/// A first block with valid proof-of-work, found by walking
/// [`Nonce::from_counter`] from zero.
#[derive(Debug, Clone)]
pub struct PowVector {
    pub name: &'static str,
    pub transactions: &'static [usize],
    /// First counter whose block hash has two leading zero bytes.
    pub counter: u64,
    pub expected_hash: &'static str,
}

impl PowVector {
    pub fn block(&self) -> Block {
        let txs = transaction_vectors();
        Block {
            prev_hash: BlockHash::ZERO,
            nonce: Nonce::from_counter(self.counter),
            transactions: self
                .transactions
                .iter()
                .map(|i| txs[*i].transaction())
                .collect(),
        }
    }
}

const HELLO_METAFILE: [u8; 32] = [0xab; 32];
const A_METAFILE: [u8; 32] = [0x01; 32];

pub fn transaction_vectors() -> Vec<TransactionVector> {
    vec![
        TransactionVector {
            name: "hello.txt",
            file_name: "hello.txt",
            metafile_hash: &HELLO_METAFILE,
            expected_hash: "704a570d7e72888c000af32b76bf7ffe02de6616f0978753df302bbee554a98e",
        },
        TransactionVector {
            name: "single-char name",
            file_name: "a",
            metafile_hash: &A_METAFILE,
            expected_hash: "8003020c0a62c5cd440b00c437207ffd090cb1570397b07f943bac25013ea0fc",
        },
        TransactionVector {
            // Preimage is four zero bytes.
            name: "empty name and hash",
            file_name: "",
            metafile_hash: &[],
            expected_hash: "df3f619804a92fdb4057192dc43dd748ea778adc52bc498ce80524c014b81119",
        },
    ]
}

pub fn block_vectors() -> Vec<BlockVector> {
    vec![
        BlockVector {
            name: "empty template on zero",
            prev_hash: [0; 32],
            nonce: [0; 32],
            transactions: &[],
            expected_hash: "1751ac12e70e15b4f76c16775cd329ae55973b612521dab2de828a5cdb6c8ab3",
        },
        BlockVector {
            name: "two transactions",
            prev_hash: [0x11; 32],
            nonce: [0x22; 32],
            transactions: &[0, 1],
            expected_hash: "3dc53d00d966b21d5e5228ae2695acc6b68d51fab5606d9aec3387dafcb2e63e",
        },
        BlockVector {
            name: "two transactions, reversed",
            prev_hash: [0x11; 32],
            nonce: [0x22; 32],
            transactions: &[1, 0],
            expected_hash: "24980d8afff31705761cb039779807a1ca2500bf22c20fc373204348d933cdf3",
        },
    ]
}

pub fn pow_vectors() -> Vec<PowVector> {
    vec![
        PowVector {
            name: "empty first block",
            transactions: &[],
            counter: 85_607,
            expected_hash: "0000b55c21a8209cad7542d04dfd4d88e27f9d9acfa91cb006e77487e734bd1b",
        },
        PowVector {
            name: "first block with hello.txt",
            transactions: &[0],
            counter: 92_308,
            expected_hash: "0000478deff1e7181e6fa718d3183d533b95816cf789db269f4b2cd23b17c43d",
        },
    ]
}

/// Check every vector. Returns `(name, matches, computed_hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let txs = transaction_vectors().into_iter().map(|v| {
        let hex = v.transaction().hash().to_hex();
        (v.name.to_string(), hex == v.expected_hash, hex)
    });
    let blocks = block_vectors().into_iter().map(|v| {
        let hex = v.block().hash().to_hex();
        (v.name.to_string(), hex == v.expected_hash, hex)
    });
    let pow = pow_vectors().into_iter().map(|v| {
        let hex = v.block().hash().to_hex();
        (v.name.to_string(), hex == v.expected_hash, hex)
    });
    txs.chain(blocks).chain(pow).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, hex) in verify_all_vectors() {
            assert!(matches, "vector '{}' hashed to {}", name, hex);
        }
    }

    #[test]
    fn test_pow_counters_are_the_first_valid() {
        for vector in pow_vectors() {
            let block = vector.block();
            assert!(block.has_valid_pow(), "{}", vector.name);
            let earlier = (0..vector.counter)
                .map(|c| block.with_nonce(Nonce::from_counter(c)))
                .any(|b| b.has_valid_pow());
            assert!(!earlier, "{} has an earlier valid nonce", vector.name);
        }
    }

    #[test]
    fn test_transaction_order_changes_block_hash() {
        let blocks = block_vectors();
        assert_ne!(blocks[1].block().hash(), blocks[2].block().hash());
    }
}
