//! Wallet-style message signatures
//!
//! Messages are signed with recoverable secp256k1 ECDSA over a double SHA-256
//! digest of the prefixed message. The signature carries its recovery id, so
//! a verifier only needs the message, the claimed address and the signature:
//! the public key is recovered and its address compared with the claim.
//!
//! Signature encoding: base64 of `header || r || s` (65 bytes) where
//! `header = 27 + recovery_id + 4` (compressed key flag).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::{double_hash, hash_bytes};
use crate::constants::ADDRESS_PREFIX;

/// Prefix mixed into every signed message so a signature can never be
/// replayed as a signature over raw data.
pub const MESSAGE_PREFIX: &str = "Star Registry Signed Message:\n";

/// Compact signature length (header byte + r + s)
const COMPACT_SIGNATURE_LEN: usize = 65;

/// Header base for compressed-key signatures
const COMPRESSED_HEADER_BASE: u8 = 27 + 4;

/// Signature errors
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Invalid signature encoding")]
    InvalidEncoding,
    #[error("Invalid signature format")]
    InvalidFormat,
    #[error("Public key recovery failed")]
    RecoveryFailed,
    #[error("Invalid address: {0}")]
    InvalidAddress(&'static str),
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// Verifies that `signature` over `message` was produced by the key behind
/// `address`.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, message: &str, address: &str, signature: &str) -> bool;
}

/// Default verifier for signatures produced by [`crate::wallet::KeyPair`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WalletVerifier;

impl SignatureVerifier for WalletVerifier {
    fn verify(&self, message: &str, address: &str, signature: &str) -> bool {
        verify_message(message, address, signature)
    }
}

/// Compute the digest that is actually signed for `message`.
pub fn message_digest(message: &str) -> [u8; 32] {
    let mut payload = Vec::with_capacity(MESSAGE_PREFIX.len() + message.len() + 18);
    write_compact_size(&mut payload, MESSAGE_PREFIX.len() as u64);
    payload.extend_from_slice(MESSAGE_PREFIX.as_bytes());
    write_compact_size(&mut payload, message.len() as u64);
    payload.extend_from_slice(message.as_bytes());

    let first = Sha256::digest(&payload);
    Sha256::digest(first).into()
}

/// Bitcoin-style variable length integer
fn write_compact_size(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Sign `message`, returning the base64 compact signature.
pub fn sign_message(key: &SigningKey, message: &str) -> Result<String, SignatureError> {
    let digest = message_digest(message);
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;

    let mut compact = Vec::with_capacity(COMPACT_SIGNATURE_LEN);
    compact.push(COMPRESSED_HEADER_BASE + recovery_id.to_byte());
    compact.extend_from_slice(&signature.to_bytes());

    Ok(STANDARD.encode(compact))
}

/// Recover the address of the key that produced `signature` over `message`.
pub fn recover_address(message: &str, signature: &str) -> Result<String, SignatureError> {
    let bytes = STANDARD
        .decode(signature.trim())
        .map_err(|_| SignatureError::InvalidEncoding)?;

    if bytes.len() != COMPACT_SIGNATURE_LEN {
        return Err(SignatureError::InvalidFormat);
    }

    let header = bytes[0];
    if !(COMPRESSED_HEADER_BASE..COMPRESSED_HEADER_BASE + 4).contains(&header) {
        return Err(SignatureError::InvalidFormat);
    }

    let recovery_id = RecoveryId::from_byte(header - COMPRESSED_HEADER_BASE)
        .ok_or(SignatureError::InvalidFormat)?;
    let sig = Signature::from_slice(&bytes[1..]).map_err(|_| SignatureError::InvalidFormat)?;

    let digest = message_digest(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(address_from_key(&key))
}

/// Check `signature` over `message` against `address`.
///
/// Any decoding or recovery failure counts as a failed verification.
pub fn verify_message(message: &str, address: &str, signature: &str) -> bool {
    match recover_address(message, signature) {
        Ok(recovered) => recovered == address,
        Err(_) => false,
    }
}

/// Derive the registry address of a public key.
///
/// Address = "ST" + Base58(BLAKE3(compressed pubkey)[0:20] + checksum[0:4])
pub fn address_from_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(true);
    let hash = hash_bytes(point.as_bytes());
    let addr_bytes = &hash.0[0..20];

    let checksum = double_hash(addr_bytes);

    let mut with_checksum = Vec::with_capacity(24);
    with_checksum.extend_from_slice(addr_bytes);
    with_checksum.extend_from_slice(&checksum.0[0..4]);

    format!("{}{}", ADDRESS_PREFIX, bs58::encode(&with_checksum).into_string())
}

/// Decode an address back to its 20-byte key hash, checking the checksum.
pub fn decode_address(address: &str) -> Result<[u8; 20], SignatureError> {
    let encoded = address
        .strip_prefix(ADDRESS_PREFIX)
        .ok_or(SignatureError::InvalidAddress("invalid prefix"))?;

    let decoded = bs58::decode(encoded)
        .into_vec()
        .map_err(|_| SignatureError::InvalidAddress("invalid base58 encoding"))?;

    if decoded.len() != 24 {
        return Err(SignatureError::InvalidAddress("invalid length"));
    }

    let (addr_bytes, checksum) = decoded.split_at(20);
    let expected = double_hash(addr_bytes);
    if checksum != &expected.0[0..4] {
        return Err(SignatureError::InvalidAddress("invalid checksum"));
    }

    let mut out = [0u8; 20];
    out.copy_from_slice(addr_bytes);
    Ok(out)
}
