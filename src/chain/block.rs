//! Block record for the star registry chain
//!
//! A block is built unsealed, then sealed exactly once by the ledger, which
//! assigns height, time, previous hash and finally the content hash.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{hash_bytes, Hash};

/// A star claim attached to a non-genesis block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StarRecord {
    /// Address that proved ownership
    pub owner: String,
    /// Caller-supplied payload
    pub star: Value,
}

/// A block of the registry chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Position in the chain
    pub height: u64,
    /// Seal time (seconds since Unix epoch)
    pub time: u64,
    /// Hex-encoded JSON payload
    pub body: String,
    /// Hash of the previous block, absent for genesis
    pub previous_block_hash: Option<Hash>,
    /// Content hash, absent until sealed
    pub hash: Option<Hash>,
}

impl Block {
    /// Create an unsealed block carrying `data` as its body
    pub fn new<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(data)?;
        Ok(Self {
            height: 0,
            time: 0,
            body: hex::encode(json),
            previous_block_hash: None,
            hash: None,
        })
    }

    /// Create an unsealed star block
    pub fn star(owner: &str, star: Value) -> Result<Self, serde_json::Error> {
        Self::new(&StarRecord {
            owner: owner.to_string(),
            star,
        })
    }

    /// Serialize every field except `hash` for hashing
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 * 3 + self.body.len() + 33);
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.time.to_le_bytes());
        bytes.extend_from_slice(&(self.body.len() as u64).to_le_bytes());
        bytes.extend_from_slice(self.body.as_bytes());
        match &self.previous_block_hash {
            Some(prev) => {
                bytes.push(1);
                bytes.extend_from_slice(&prev.0);
            }
            None => bytes.push(0),
        }
        bytes
    }

    /// Calculate the content hash of this block
    pub fn compute_hash(&self) -> Hash {
        hash_bytes(&self.to_bytes())
    }

    /// Assign position fields and the content hash
    pub fn seal(mut self, height: u64, time: u64, previous_block_hash: Option<Hash>) -> Self {
        self.height = height;
        self.time = time;
        self.previous_block_hash = previous_block_hash;
        self.hash = Some(self.compute_hash());
        self
    }

    /// Recompute the content hash and compare with the stored one
    pub fn self_validate(&self) -> bool {
        self.hash == Some(self.compute_hash())
    }

    /// Decode the body back to JSON
    pub fn decode_body(&self) -> Option<Value> {
        let bytes = hex::decode(&self.body).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Decode the body as a star record; `None` for genesis or foreign bodies
    pub fn star_record(&self) -> Option<StarRecord> {
        if self.is_genesis() {
            return None;
        }
        let bytes = hex::decode(&self.body).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Genesis is the block at height 0
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}

impl AsRef<Block> for Block {
    fn as_ref(&self) -> &Block {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sealed_star() -> Block {
        Block::star("STowner", json!({"dec": "1", "ra": "2"}))
            .unwrap()
            .seal(1, 1_700_000_000, Some(hash_bytes(b"prev")))
    }

    #[test]
    fn test_seal_sets_hash_once() {
        let block = sealed_star();
        assert_eq!(block.hash, Some(block.compute_hash()));
        assert!(block.self_validate());
    }

    #[test]
    fn test_unsealed_block_fails_self_validation() {
        let block = Block::star("STowner", json!({})).unwrap();
        assert!(block.hash.is_none());
        assert!(!block.self_validate());
    }

    #[test]
    fn test_any_field_change_breaks_hash() {
        let block = sealed_star();

        let mut b = block.clone();
        b.height = 2;
        assert!(!b.self_validate());

        let mut b = block.clone();
        b.time += 1;
        assert!(!b.self_validate());

        let mut b = block.clone();
        b.body = hex::encode(b"{}");
        assert!(!b.self_validate());

        let mut b = block.clone();
        b.previous_block_hash = None;
        assert!(!b.self_validate());
    }

    #[test]
    fn test_star_record_roundtrip() {
        let block = sealed_star();
        let record = block.star_record().unwrap();
        assert_eq!(record.owner, "STowner");
        assert_eq!(record.star, json!({"dec": "1", "ra": "2"}));
    }

    #[test]
    fn test_foreign_body_is_not_a_star() {
        let block = Block::new(&json!({"data": "something else"}))
            .unwrap()
            .seal(3, 0, Some(Hash::zero()));
        assert!(block.star_record().is_none());
        assert_eq!(block.decode_body(), Some(json!({"data": "something else"})));

        let mut junk = block.clone();
        junk.body = "not hex".to_string();
        assert!(junk.star_record().is_none());
        assert!(junk.decode_body().is_none());
    }

    #[test]
    fn test_genesis_detection_is_structural() {
        let genesis = Block::star("STowner", json!({})).unwrap().seal(0, 0, None);
        assert!(genesis.is_genesis());
        assert!(genesis.star_record().is_none());
        assert!(!sealed_star().is_genesis());
    }
}
