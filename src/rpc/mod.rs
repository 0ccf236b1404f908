//! JSON-RPC API Module
//!
//! Provides HTTP interface for external applications to claim stars and
//! query the ledger.

mod methods;
mod server;

pub use methods::*;
pub use server::*;
