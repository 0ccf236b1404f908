//! Wallet implementation
//!
//! Handles key generation and message signing. The wallet is a client-side
//! concern: the ledger only ever sees addresses and signatures.

use std::collections::HashMap;

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::crypto::{address_from_key, sign_message};

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Signing error: {0}")]
    SigningError(String),
    #[error("Unknown address: {0}")]
    UnknownAddress(String),
    #[error("Wallet full: {0} keys held")]
    Full(usize),
}

/// A wallet key pair
#[derive(Clone)]
pub struct KeyPair {
    /// Private key (for signing)
    signing_key: SigningKey,
    /// Address (derived from public key)
    pub address: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Import from private key bytes
    pub fn from_private_key_bytes(bytes: &[u8; 32]) -> Result<Self, WalletError> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|_| WalletError::InvalidPrivateKey)?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_from_key(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// Export private key bytes
    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Sign a challenge message, returning the base64 signature
    pub fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        sign_message(&self.signing_key, message).map_err(|e| WalletError::SigningError(e.to_string()))
    }
}

/// A simple wallet, optionally bounded in the number of keys it holds
#[derive(Debug)]
pub struct Wallet {
    /// Wallet keys (address -> keypair)
    keys: HashMap<String, KeyPair>,
    max_keys: usize,
}

impl Default for Wallet {
    fn default() -> Self {
        Self::with_limit(usize::MAX)
    }
}

impl Wallet {
    /// Create a new empty wallet
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a wallet that refuses to hold more than `max_keys` keys
    pub fn with_limit(max_keys: usize) -> Self {
        Self {
            keys: HashMap::new(),
            max_keys,
        }
    }

    /// Generate a new key and add to wallet
    pub fn generate_key(&mut self) -> Result<&KeyPair, WalletError> {
        self.insert(KeyPair::generate())
    }

    /// Import a key; re-importing a held key is a no-op
    pub fn import_key(&mut self, bytes: &[u8; 32]) -> Result<&KeyPair, WalletError> {
        self.insert(KeyPair::from_private_key_bytes(bytes)?)
    }

    fn insert(&mut self, keypair: KeyPair) -> Result<&KeyPair, WalletError> {
        if !self.keys.contains_key(&keypair.address) && self.keys.len() >= self.max_keys {
            return Err(WalletError::Full(self.keys.len()));
        }
        Ok(self.keys.entry(keypair.address.clone()).or_insert(keypair))
    }

    /// Get a keypair by address
    pub fn get_key_for_address(&self, address: &str) -> Option<&KeyPair> {
        self.keys.get(address)
    }

    /// Get all addresses
    pub fn get_addresses(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).collect()
    }

    /// Sign `message` with the key behind `address`
    pub fn sign_message(&self, address: &str, message: &str) -> Result<String, WalletError> {
        self.get_key_for_address(address)
            .ok_or_else(|| WalletError::UnknownAddress(address.to_string()))?
            .sign_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ADDRESS_PREFIX;
    use crate::crypto::{decode_address, verify_message};

    #[test]
    fn test_keypair_generation() {
        let kp = KeyPair::generate();
        assert!(kp.address.starts_with(ADDRESS_PREFIX));
        assert!(decode_address(&kp.address).is_ok());
    }

    #[test]
    fn test_keypair_export_import() {
        let kp1 = KeyPair::generate();
        let bytes = kp1.private_key_bytes();
        let kp2 = KeyPair::from_private_key_bytes(&bytes).unwrap();

        assert_eq!(kp1.address, kp2.address);
    }

    #[test]
    fn test_zero_key_rejected() {
        assert!(matches!(
            KeyPair::from_private_key_bytes(&[0u8; 32]),
            Err(WalletError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let kp = KeyPair::generate();
        let debug = format!("{kp:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&hex::encode(kp.private_key_bytes())));
    }

    #[test]
    fn test_wallet_signs_for_its_addresses() {
        let mut wallet = Wallet::new();
        let address = wallet.generate_key().unwrap().address.clone();
        assert_eq!(wallet.get_addresses(), vec![address.as_str()]);

        let signature = wallet.sign_message(&address, "hello").unwrap();
        assert!(verify_message("hello", &address, &signature));

        assert!(matches!(
            wallet.sign_message("STnobody", "hello"),
            Err(WalletError::UnknownAddress(_))
        ));
    }

    #[test]
    fn test_import_is_idempotent() {
        let mut wallet = Wallet::new();
        let bytes = KeyPair::generate().private_key_bytes();

        let first = wallet.import_key(&bytes).unwrap().address.clone();
        let second = wallet.import_key(&bytes).unwrap().address.clone();
        assert_eq!(first, second);
        assert_eq!(wallet.get_addresses().len(), 1);
    }

    #[test]
    fn test_wallet_limit() {
        let mut wallet = Wallet::with_limit(2);
        let held = KeyPair::generate().private_key_bytes();

        wallet.import_key(&held).unwrap();
        wallet.generate_key().unwrap();
        assert!(matches!(wallet.generate_key(), Err(WalletError::Full(2))));
        assert!(matches!(
            wallet.import_key(&KeyPair::generate().private_key_bytes()),
            Err(WalletError::Full(2))
        ));

        // Keys already held can still be re-imported
        assert!(wallet.import_key(&held).is_ok());
        assert_eq!(wallet.get_addresses().len(), 2);
    }
}
