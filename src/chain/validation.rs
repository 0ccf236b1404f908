//! Chain validation
//!
//! Pure functions over a snapshot of the chain. Faults are collected rather
//! than returned early, so a single audit reports every broken block.

use serde::Serialize;
use thiserror::Error;

use super::Block;

/// A single integrity failure found while walking the chain
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainFault {
    #[error("block {height}: stored hash does not match content")]
    HashMismatch { height: u64 },
    #[error("block {height}: previous hash does not match its parent")]
    BrokenLink { height: u64 },
    #[error("genesis block has a previous hash")]
    GenesisHasParent,
    #[error("block at position {position} claims height {height}")]
    HeightMismatch { position: u64, height: u64 },
}

/// Result of a chain audit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainAudit {
    /// Number of blocks inspected
    pub blocks_checked: u64,
    /// Every fault found, in chain order
    pub faults: Vec<ChainFault>,
}

impl ChainAudit {
    /// Whether the chain passed every check
    pub fn is_valid(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Validate every block of `blocks`: self-hash, position and linkage.
pub fn validate_chain<B: AsRef<Block>>(blocks: &[B]) -> ChainAudit {
    let mut faults = Vec::new();

    for (position, block) in blocks.iter().enumerate() {
        let prev = position.checked_sub(1).map(|i| blocks[i].as_ref());
        check_block(position as u64, block.as_ref(), prev, &mut faults);
    }

    ChainAudit {
        blocks_checked: blocks.len() as u64,
        faults,
    }
}

/// Validate only the last block of `blocks` against its predecessor.
///
/// Assumes everything below the tip was validated when it was appended.
pub fn validate_tip<B: AsRef<Block>>(blocks: &[B]) -> ChainAudit {
    let mut faults = Vec::new();

    let Some(position) = blocks.len().checked_sub(1) else {
        return ChainAudit::default();
    };
    let prev = position.checked_sub(1).map(|i| blocks[i].as_ref());
    check_block(position as u64, blocks[position].as_ref(), prev, &mut faults);

    ChainAudit {
        blocks_checked: 1,
        faults,
    }
}

fn check_block(position: u64, block: &Block, prev: Option<&Block>, faults: &mut Vec<ChainFault>) {
    if block.height != position {
        faults.push(ChainFault::HeightMismatch {
            position,
            height: block.height,
        });
    }

    if !block.self_validate() {
        faults.push(ChainFault::HashMismatch { height: position });
    }

    match prev {
        None => {
            if block.previous_block_hash.is_some() {
                faults.push(ChainFault::GenesisHasParent);
            }
        }
        Some(prev) => {
            if prev.hash.is_none() || block.previous_block_hash != prev.hash {
                faults.push(ChainFault::BrokenLink { height: position });
            }
        }
    }
}
