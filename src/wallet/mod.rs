//! Wallet module - Key management and message signing

mod wallet;

pub use wallet::*;
