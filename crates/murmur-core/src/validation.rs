//! Structural checks applied to inbound protocol data.

use crate::block::{Block, Transaction};
use crate::clock::FIRST_ID;
use crate::error::ValidationError;
use crate::rumor::Rumor;

/// Validate a rumor's structure (not its admission; that is the clock's job).
pub fn validate_rumor(rumor: &Rumor) -> Result<(), ValidationError> {
    if rumor.origin.is_empty() {
        return Err(ValidationError::EmptyOrigin);
    }
    if rumor.id < FIRST_ID {
        return Err(ValidationError::InvalidSequence {
            expected: FIRST_ID,
            got: rumor.id,
        });
    }
    Ok(())
}

/// Validate a transaction's structure.
pub fn validate_transaction(tx: &Transaction) -> Result<(), ValidationError> {
    if tx.file.name.is_empty() {
        return Err(ValidationError::EmptyFileName);
    }
    Ok(())
}

/// Validate a block's proof-of-work.
///
/// Parent linkage is checked by the fork tree, which knows the other blocks.
pub fn validate_block(block: &Block) -> Result<(), ValidationError> {
    if !block.has_valid_pow() {
        return Err(ValidationError::InvalidProofOfWork(block.hash()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::FileRecord;
    use crate::crypto::BlockHash;
    use crate::types::Nonce;

    #[test]
    fn test_validate_rumor() {
        assert!(validate_rumor(&Rumor::new("A", 1, "x")).is_ok());
        assert!(matches!(
            validate_rumor(&Rumor::new("", 1, "x")),
            Err(ValidationError::EmptyOrigin)
        ));
        assert!(matches!(
            validate_rumor(&Rumor::new("A", 0, "x")),
            Err(ValidationError::InvalidSequence { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn test_validate_transaction() {
        let ok = Transaction::new(FileRecord::new("a", 1, vec![]), 10);
        let bad = Transaction::new(FileRecord::new("", 1, vec![]), 10);
        assert!(validate_transaction(&ok).is_ok());
        assert!(validate_transaction(&bad).is_err());
    }

    #[test]
    fn test_validate_block_rejects_bad_pow() {
        let mut counter = 0u64;
        let template = Block::template(BlockHash::ZERO);
        let bad = loop {
            let b = template.with_nonce(Nonce::from_counter(counter));
            if !b.has_valid_pow() {
                break b;
            }
            counter += 1;
        };
        assert!(matches!(
            validate_block(&bad),
            Err(ValidationError::InvalidProofOfWork(_))
        ));
    }
}
