//! Star Registry Node
//!
//! Main entry point: seals genesis, then serves the JSON-RPC API until
//! interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use star_registry::chain::{AppendValidation, Ledger, SystemClock};
use star_registry::config::NodeConfig;
use star_registry::crypto::WalletVerifier;
use star_registry::registry::StarRegistry;
use star_registry::rpc::{start_rpc_server, RpcState};
use star_registry::telemetry;

#[derive(Debug, Parser)]
#[command(name = "star-node", version, about = "Star registry ledger node")]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RPC port
    #[arg(short, long)]
    port: Option<u16>,

    /// RPC bind address
    #[arg(long)]
    bind: Option<String>,

    /// Challenge validity window in seconds
    #[arg(long)]
    window: Option<u64>,

    /// Validate only the chain tip before each append
    #[arg(long)]
    incremental_validation: bool,
}

impl Cli {
    fn into_config(self) -> Result<NodeConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };

        if let Some(port) = self.port {
            config.rpc_port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(window) = self.window {
            config.verification_window_secs = window;
        }
        if self.incremental_validation {
            config.append_validation = AppendValidation::Incremental;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;
    telemetry::init(&config.log_level);

    let clock = Arc::new(SystemClock);
    let ledger = match Ledger::initialize(clock.clone(), config.append_validation).await {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => {
            error!(error = %e, "failed to initialize ledger");
            return Err(e.into());
        }
    };

    let registry = Arc::new(StarRegistry::new(
        ledger,
        Arc::new(WalletVerifier),
        clock,
        config.verification_window_secs,
    ));
    let state = Arc::new(RpcState::new(registry, config.wallet_max_keys));
    let addr = config.rpc_addr()?;

    info!(
        %addr,
        window_secs = config.verification_window_secs,
        validation = ?config.append_validation,
        "star registry node starting"
    );

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received, stopping node"),
            Err(e) => {
                error!(error = %e, "cannot listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        }
    };

    start_rpc_server(state, addr, shutdown).await?;
    info!("node stopped");
    Ok(())
}
