//! Chain module - Block record, validation and the ledger

mod block;
mod clock;
mod ledger;
mod validation;

pub use block::*;
pub use clock::*;
pub use ledger::*;
pub use validation::*;
