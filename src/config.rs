//! Node configuration, parsed from a JSON file.
//!
//! Every field has a default, so an empty object (or no file at all) is a
//! valid configuration. CLI flags are applied on top by the binary.

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::chain::AppendValidation;
use crate::constants::{DEFAULT_RPC_PORT, DEFAULT_WALLET_MAX_KEYS, VERIFICATION_WINDOW_SECS};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level node configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Interface the RPC server binds to
    pub bind_address: String,
    /// Port of the JSON-RPC server
    pub rpc_port: u16,
    /// How long a challenge stays valid, in seconds
    pub verification_window_secs: u64,
    /// Chain check performed before each append
    pub append_validation: AppendValidation,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Upper bound on keys held by the node wallet (`getnewaddress`, `importprivkey`)
    pub wallet_max_keys: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            verification_window_secs: VERIFICATION_WINDOW_SECS,
            append_validation: AppendValidation::Full,
            log_level: "info".to_string(),
            wallet_max_keys: DEFAULT_WALLET_MAX_KEYS,
        }
    }
}

impl NodeConfig {
    /// Load and validate a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse and validate a JSON document
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verification_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "verification_window_secs must be positive".into(),
            ));
        }
        if self.wallet_max_keys == 0 {
            return Err(ConfigError::Invalid("wallet_max_keys must be positive".into()));
        }
        if self.rpc_port == 0 {
            return Err(ConfigError::Invalid("rpc_port must be non-zero".into()));
        }
        self.rpc_addr()?;
        Ok(())
    }

    /// Socket address for the RPC server
    pub fn rpc_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_address, self.rpc_port)
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad bind address {:?}", self.bind_address)))
    }
}
