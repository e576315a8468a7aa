// Blockchain module
//
// This module contains the core ledger implementation including:
// - Transaction structure
// - Block structure and hashing
// - Proof of work puzzle
// - Chain structure and validation
// - Shared ledger handle used by the API

pub mod block;
pub mod chain;
pub mod ledger;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, BlockSummary};
pub use chain::{Chain, ChainError};
pub use ledger::Ledger;
pub use pow::MiningOutcome;
pub use transaction::{InputRef, OutputRef, Transaction};
