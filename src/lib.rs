//! Star Registry Core Library
//!
//! An in-process, append-only ledger of hash-linked blocks. Callers claim a
//! star by signing a time-bound challenge with their wallet key; a verified
//! claim is sealed into the chain under the caller's address.

pub mod chain;
pub mod config;
pub mod crypto;
pub mod node;
pub mod registry;
pub mod rpc;
pub mod telemetry;
pub mod wallet;

/// Protocol constants
pub mod constants {
    /// Trailing field of every challenge message
    pub const CHALLENGE_SUFFIX: &str = "starRegistry";

    /// Separator between challenge message fields
    pub const CHALLENGE_SEPARATOR: char = ':';

    /// Default ownership verification window in seconds
    pub const VERIFICATION_WINDOW_SECS: u64 = 300;

    /// Address prefix (short form for addresses)
    pub const ADDRESS_PREFIX: &str = "ST";

    /// Payload carried by the genesis block
    pub const GENESIS_DATA: &str = "Genesis Block";

    /// Default JSON-RPC port
    pub const DEFAULT_RPC_PORT: u16 = 8545;

    /// Default cap on keys held by the node wallet
    pub const DEFAULT_WALLET_MAX_KEYS: usize = 64;
}
