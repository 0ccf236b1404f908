//! The ledger: an ordered, append-only sequence of sealed blocks.
//!
//! Appends are serialized by a single writer lock held across
//! validate -> seal -> push. Readers clone the `Arc` vector under a short
//! read lock and work on that snapshot, so a block only becomes visible once
//! it is fully sealed, and height (the vector length) moves with it.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{validate_chain, validate_tip, Block, ChainAudit, ChainFault, Clock};
use crate::crypto::Hash;
use crate::node::create_genesis_block;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Chain corruption detected: {} fault(s)", .faults.len())]
    ChainCorruption { faults: Vec<ChainFault> },
    #[error("Genesis block could not be sealed: {0}")]
    Genesis(String),
    #[error("Block body encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// How much of the chain is re-checked before each append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppendValidation {
    /// Recompute every block (O(n) per append)
    #[default]
    Full,
    /// Check only the current tip and its link; the audit covers the rest
    Incremental,
}

/// Hash-linked block sequence
pub struct Ledger {
    blocks: RwLock<Vec<Arc<Block>>>,
    writer: Mutex<()>,
    clock: Arc<dyn Clock>,
    validation: AppendValidation,
}

impl Ledger {
    /// Create the ledger and seal its genesis block.
    ///
    /// Fails instead of returning an empty ledger when genesis cannot be
    /// sealed.
    pub async fn initialize(
        clock: Arc<dyn Clock>,
        validation: AppendValidation,
    ) -> Result<Self, LedgerError> {
        let ledger = Self {
            blocks: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
            clock,
            validation,
        };

        let genesis = create_genesis_block().map_err(|e| LedgerError::Genesis(e.to_string()))?;
        let sealed = ledger
            .append(genesis)
            .await
            .map_err(|e| LedgerError::Genesis(e.to_string()))?;

        info!(
            hash = %display_hash(&sealed),
            time = sealed.time,
            ?validation,
            "genesis block sealed"
        );
        Ok(ledger)
    }

    /// Validate the chain, then seal `candidate` on top of it.
    pub async fn append(&self, candidate: Block) -> Result<Block, LedgerError> {
        let _writer = self.writer.lock().await;

        let snapshot = self.snapshot();
        let audit = match self.validation {
            AppendValidation::Full => validate_chain(&snapshot),
            AppendValidation::Incremental => validate_tip(&snapshot),
        };

        if !audit.is_valid() {
            warn!(faults = ?audit.faults, "append rejected: chain failed validation");
            return Err(LedgerError::ChainCorruption {
                faults: audit.faults,
            });
        }

        let height = snapshot.len() as u64;
        let previous = snapshot.last().and_then(|b| b.hash);
        let block = candidate.seal(height, self.clock.now_secs(), previous);

        self.blocks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(block.clone()));

        debug!(height, hash = %display_hash(&block), "block appended");
        Ok(block)
    }

    /// Index of the most recent block
    pub fn get_height(&self) -> u64 {
        (self.read().len() as u64).saturating_sub(1)
    }

    /// Look a block up by its sealed hash
    pub fn get_block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.read()
            .iter()
            .find(|b| b.hash.as_ref() == Some(hash))
            .map(|b| Block::clone(b))
    }

    /// Look a block up by height
    pub fn get_block_by_height(&self, height: u64) -> Option<Block> {
        self.read()
            .iter()
            .find(|b| b.height == height)
            .map(|b| Block::clone(b))
    }

    /// Blocks with `start <= height <= end`, in chain order
    pub fn get_blocks_range(&self, start: u64, end: u64) -> Vec<Block> {
        self.read()
            .iter()
            .filter(|b| (start..=end).contains(&b.height))
            .map(|b| Block::clone(b))
            .collect()
    }

    /// Star payloads claimed by `owner`, in chain order
    pub fn get_stars_by_owner(&self, owner: &str) -> Vec<Value> {
        self.snapshot()
            .iter()
            .filter(|b| !b.is_genesis())
            .filter_map(|b| b.star_record())
            .filter(|record| record.owner == owner)
            .map(|record| record.star)
            .collect()
    }

    /// Copy of every block
    pub fn blocks(&self) -> Vec<Block> {
        self.read().iter().map(|b| Block::clone(b)).collect()
    }

    /// Full integrity audit; reports faults instead of failing
    pub fn validate_chain(&self) -> ChainAudit {
        let snapshot = self.snapshot();
        let audit = validate_chain(&snapshot);
        if audit.is_valid() {
            debug!(blocks = audit.blocks_checked, "chain audit passed");
        } else {
            warn!(faults = ?audit.faults, "chain audit failed");
        }
        audit
    }

    pub fn append_validation(&self) -> AppendValidation {
        self.validation
    }

    fn snapshot(&self) -> Vec<Arc<Block>> {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Block>>> {
        self.blocks.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn tamper(&self, height: usize, f: impl FnOnce(&mut Block)) {
        let mut blocks = self.blocks.write().unwrap();
        let mut block = Block::clone(&blocks[height]);
        f(&mut block);
        blocks[height] = Arc::new(block);
    }
}

fn display_hash(block: &Block) -> String {
    block.hash.map(|h| h.to_hex()).unwrap_or_default()
}
