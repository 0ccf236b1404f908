//! Star registry service
//!
//! Issues challenges, checks signed proofs and appends verified star claims
//! to the ledger. Also the single entry point for ledger queries.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::{Challenge, RegistryError};
use crate::chain::{AppendValidation, Block, ChainAudit, Clock, Ledger};
use crate::crypto::{Hash, SignatureVerifier};

/// Ownership verification in front of a [`Ledger`]
pub struct StarRegistry {
    ledger: Arc<Ledger>,
    verifier: Arc<dyn SignatureVerifier>,
    clock: Arc<dyn Clock>,
    window_secs: u64,
}

impl StarRegistry {
    pub fn new(
        ledger: Arc<Ledger>,
        verifier: Arc<dyn SignatureVerifier>,
        clock: Arc<dyn Clock>,
        window_secs: u64,
    ) -> Self {
        Self {
            ledger,
            verifier,
            clock,
            window_secs,
        }
    }

    /// Issue the message `address` must sign to claim a star.
    pub fn request_challenge(&self, address: &str) -> Result<String, RegistryError> {
        if !Challenge::accepts_address(address) {
            return Err(RegistryError::InvalidAddress);
        }
        Ok(Challenge::format(address, self.clock.now_secs()))
    }

    /// Verify a signed challenge and record `star` under `address`.
    ///
    /// Checks, in order: message shape, freshness, signature. Only then is
    /// the block handed to the ledger.
    pub async fn submit_proof(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        star: Value,
    ) -> Result<Block, RegistryError> {
        let challenge = Challenge::parse(message)?;
        if challenge.address != address {
            return Err(RegistryError::MalformedMessage(
                "message was issued for a different address".into(),
            ));
        }

        let now = self.clock.now_secs();
        let elapsed = now.checked_sub(challenge.timestamp).ok_or_else(|| {
            RegistryError::MalformedMessage("challenge timestamp is in the future".into())
        })?;

        if elapsed >= self.window_secs {
            warn!(address, elapsed, "proof rejected: challenge expired");
            return Err(RegistryError::VerificationExpired {
                elapsed,
                window: self.window_secs,
            });
        }

        if !self.verifier.verify(message, address, signature) {
            warn!(address, "proof rejected: invalid signature");
            return Err(RegistryError::InvalidSignature);
        }

        let block = self.ledger.append(Block::star(address, star)?).await?;
        info!(
            owner = address,
            height = block.height,
            hash = %block.hash.map(|h| h.to_hex()).unwrap_or_default(),
            "star registered"
        );
        Ok(block)
    }

    pub fn get_chain_height(&self) -> u64 {
        self.ledger.get_height()
    }

    pub fn get_block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.ledger.get_block_by_hash(hash)
    }

    pub fn get_block_by_height(&self, height: u64) -> Option<Block> {
        self.ledger.get_block_by_height(height)
    }

    pub fn get_blocks_range(&self, start: u64, end: u64) -> Vec<Block> {
        self.ledger.get_blocks_range(start, end)
    }

    pub fn get_stars_by_owner(&self, address: &str) -> Vec<Value> {
        self.ledger.get_stars_by_owner(address)
    }

    pub fn validate_chain(&self) -> ChainAudit {
        self.ledger.validate_chain()
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    pub fn append_validation(&self) -> AppendValidation {
        self.ledger.append_validation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{LedgerError, ManualClock};
    use crate::crypto::WalletVerifier;
    use crate::wallet::KeyPair;
    use serde_json::json;

    const T0: u64 = 1_700_000_000;

    /// Accepts or rejects everything, to isolate the freshness checks
    struct FixedVerifier(bool);

    impl SignatureVerifier for FixedVerifier {
        fn verify(&self, _: &str, _: &str, _: &str) -> bool {
            self.0
        }
    }

    async fn registry(verifier: Arc<dyn SignatureVerifier>) -> (StarRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let ledger = Ledger::initialize(clock.clone(), AppendValidation::Full)
            .await
            .unwrap();
        let registry = StarRegistry::new(Arc::new(ledger), verifier, clock.clone(), 300);
        (registry, clock)
    }

    #[tokio::test]
    async fn test_challenge_format() {
        let (registry, _) = registry(Arc::new(WalletVerifier)).await;
        assert_eq!(
            registry.request_challenge("STabc").unwrap(),
            format!("STabc:{T0}:starRegistry")
        );
    }

    #[tokio::test]
    async fn test_empty_address_is_rejected() {
        let (registry, _) = registry(Arc::new(WalletVerifier)).await;
        assert!(matches!(
            registry.request_challenge(""),
            Err(RegistryError::InvalidAddress)
        ));
        assert!(matches!(
            registry.request_challenge("   "),
            Err(RegistryError::InvalidAddress)
        ));
    }

    #[tokio::test]
    async fn test_address_with_separator_is_rejected() {
        let (registry, clock) = registry(Arc::new(FixedVerifier(true))).await;
        assert!(matches!(
            registry.request_challenge("bc1:abc"),
            Err(RegistryError::InvalidAddress)
        ));

        // Every issued challenge can be redeemed
        let message = registry.request_challenge("bc1abc").unwrap();
        clock.advance(10);
        assert!(registry
            .submit_proof("bc1abc", &message, "sig", json!({}))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_blank_address_in_message_is_malformed() {
        let (registry, _) = registry(Arc::new(FixedVerifier(true))).await;
        let message = Challenge::format("  ", T0);
        assert!(matches!(
            registry.submit_proof("  ", &message, "sig", json!({})).await,
            Err(RegistryError::MalformedMessage(_))
        ));
        assert_eq!(registry.get_chain_height(), 0);
    }

    #[tokio::test]
    async fn test_chain_corruption_propagates() {
        let (registry, _) = registry(Arc::new(WalletVerifier)).await;
        let key = KeyPair::generate();
        let message = registry.request_challenge(&key.address).unwrap();
        let signature = key.sign_message(&message).unwrap();

        registry.ledger.tamper(0, |b| b.time += 1);

        assert!(matches!(
            registry
                .submit_proof(&key.address, &message, &signature, json!({}))
                .await,
            Err(RegistryError::Ledger(LedgerError::ChainCorruption { .. }))
        ));
        assert_eq!(registry.get_chain_height(), 0);
    }

    #[tokio::test]
    async fn test_valid_proof_appends() {
        let (registry, clock) = registry(Arc::new(WalletVerifier)).await;
        let key = KeyPair::generate();

        let message = registry.request_challenge(&key.address).unwrap();
        let signature = key.sign_message(&message).unwrap();
        clock.advance(100);

        let block = registry
            .submit_proof(&key.address, &message, &signature, json!({"dec": "1", "ra": "2"}))
            .await
            .unwrap();

        assert_eq!(block.height, 1);
        assert_eq!(registry.get_chain_height(), 1);
        assert_eq!(block.star_record().unwrap().owner, key.address);
        assert_eq!(
            registry.get_stars_by_owner(&key.address),
            vec![json!({"dec": "1", "ra": "2"})]
        );
    }

    #[tokio::test]
    async fn test_window_boundaries() {
        let (registry, clock) = registry(Arc::new(FixedVerifier(true))).await;
        let message = registry.request_challenge("STabc").unwrap();

        clock.advance(299);
        assert!(registry
            .submit_proof("STabc", &message, "sig", json!({}))
            .await
            .is_ok());

        clock.advance(1);
        assert!(matches!(
            registry.submit_proof("STabc", &message, "sig", json!({})).await,
            Err(RegistryError::VerificationExpired { elapsed: 300, window: 300 })
        ));
        assert_eq!(registry.get_chain_height(), 1);
    }

    #[tokio::test]
    async fn test_expiry_checked_before_signature() {
        let (registry, clock) = registry(Arc::new(FixedVerifier(false))).await;
        let message = registry.request_challenge("STabc").unwrap();

        clock.advance(301);
        assert!(matches!(
            registry.submit_proof("STabc", &message, "sig", json!({})).await,
            Err(RegistryError::VerificationExpired { .. })
        ));
    }

    #[tokio::test]
    async fn test_bad_signature_is_an_error() {
        let (registry, _) = registry(Arc::new(WalletVerifier)).await;
        let owner = KeyPair::generate();
        let impostor = KeyPair::generate();

        let message = registry.request_challenge(&owner.address).unwrap();
        let signature = impostor.sign_message(&message).unwrap();

        assert!(matches!(
            registry
                .submit_proof(&owner.address, &message, &signature, json!({}))
                .await,
            Err(RegistryError::InvalidSignature)
        ));
        assert_eq!(registry.get_chain_height(), 0);
    }

    #[tokio::test]
    async fn test_message_for_other_address_is_malformed() {
        let (registry, _) = registry(Arc::new(FixedVerifier(true))).await;
        let message = registry.request_challenge("STabc").unwrap();

        assert!(matches!(
            registry.submit_proof("STxyz", &message, "sig", json!({})).await,
            Err(RegistryError::MalformedMessage(_))
        ));
    }

    #[tokio::test]
    async fn test_future_timestamp_is_malformed() {
        let (registry, _) = registry(Arc::new(FixedVerifier(true))).await;
        let message = Challenge::format("STabc", T0 + 60);

        assert!(matches!(
            registry.submit_proof("STabc", &message, "sig", json!({})).await,
            Err(RegistryError::MalformedMessage(_))
        ));
    }
}
