//! Challenge messages
//!
//! A challenge is `<address>:<unix seconds>:starRegistry`. Nothing is stored
//! server side; the caller echoes the message back with its signature.

use crate::constants::{CHALLENGE_SEPARATOR, CHALLENGE_SUFFIX};

use super::RegistryError;

/// A parsed challenge message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge<'a> {
    pub address: &'a str,
    pub timestamp: u64,
}

impl<'a> Challenge<'a> {
    /// Parse `message`, which must have exactly three fields and end with the
    /// registry suffix.
    pub fn parse(message: &'a str) -> Result<Self, RegistryError> {
        let fields: Vec<&str> = message.split(CHALLENGE_SEPARATOR).collect();
        let [address, timestamp, suffix] = fields.as_slice() else {
            return Err(RegistryError::MalformedMessage(format!(
                "expected 3 fields, found {}",
                fields.len()
            )));
        };

        if *suffix != CHALLENGE_SUFFIX {
            return Err(RegistryError::MalformedMessage(format!(
                "unexpected suffix {suffix:?}"
            )));
        }

        if !Self::accepts_address(address) {
            return Err(RegistryError::MalformedMessage(format!(
                "invalid address {address:?}"
            )));
        }

        let timestamp = timestamp.parse::<u64>().map_err(|_| {
            RegistryError::MalformedMessage(format!("invalid timestamp {timestamp:?}"))
        })?;

        Ok(Self {
            address: *address,
            timestamp,
        })
    }

    /// Whether a challenge for `address` can be parsed back: not blank and
    /// free of the field separator.
    pub fn accepts_address(address: &str) -> bool {
        !address.trim().is_empty() && !address.contains(CHALLENGE_SEPARATOR)
    }

    /// Render the message for `address` issued at `timestamp`
    pub fn format(address: &str, timestamp: u64) -> String {
        format!(
            "{address}{sep}{timestamp}{sep}{CHALLENGE_SUFFIX}",
            sep = CHALLENGE_SEPARATOR
        )
    }
}
