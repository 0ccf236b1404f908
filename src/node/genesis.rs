//! Genesis block generation for the star registry
//!
//! The genesis block carries a fixed marker body and is always the block at
//! height 0. It is sealed by the ledger like any other block, so its hash
//! depends on the time the ledger was initialized.

use serde::{Deserialize, Serialize};

use crate::chain::Block;
use crate::constants::GENESIS_DATA;

/// Body of the genesis block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisData {
    pub data: String,
}

impl Default for GenesisData {
    fn default() -> Self {
        Self {
            data: GENESIS_DATA.to_string(),
        }
    }
}

/// Create the unsealed genesis block
///
/// Called exactly once, by ledger initialization.
pub fn create_genesis_block() -> Result<Block, serde_json::Error> {
    Block::new(&GenesisData::default())
}
