//! Token Ledger Core
//!
//! Loyalty-token accounting engine: per-user balances, an append-only
//! transaction log, and the decision rules that keep them consistent.
//!
//! # Architecture
//!
//! - **Typed transactions**: `earn | spend | stake | unstake`, a closed set
//! - **Single writer**: one actor task serializes all mutations
//! - **Atomic commits**: balance update and ledger entry land in one batch
//! - **Append-only**: transactions are never modified or deleted
//!
//! # Invariants
//!
//! - `balance == total_earned - total_spent` after every commit
//! - `balance`, `total_earned`, `total_spent`, `staked` never go negative
//! - Rejected proposals leave account and ledger untouched

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod processor;
pub mod rewards;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use storage::Storage;
pub use types::{Account, Effect, Transaction, TxKind, UserId};
