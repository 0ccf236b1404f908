//! Cryptography module - BLAKE3 hashing, wallet message signatures

mod hash;
mod message;

pub use hash::*;
pub use message::*;
