//! Registry module - ownership verification for star claims

mod challenge;
mod service;

pub use challenge::*;
pub use service::*;

use thiserror::Error;

use crate::chain::LedgerError;

/// Errors surfaced by the registry to its callers
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid address")]
    InvalidAddress,
    #[error("Malformed challenge message: {0}")]
    MalformedMessage(String),
    #[error("Verification expired: {elapsed}s elapsed, window is {window}s")]
    VerificationExpired { elapsed: u64, window: u64 },
    #[error("Invalid signature")]
    InvalidSignature,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Ledger(LedgerError::Encoding(e))
    }
}
