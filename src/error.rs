//! Error types for the token ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Policy rejections (see [`Error::is_rejection`]) are typed refusals that
/// leave all state untouched. Everything else is infrastructure failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Proposed amount is zero or negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Spend or stake exceeds available balance
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Amount the proposal asked for
        requested: Decimal,
        /// Balance available at decision time
        available: Decimal,
    },

    /// Stake amount is under the policy minimum
    #[error("Stake amount {requested} below minimum {minimum}")]
    BelowMinimumStake {
        /// Amount the proposal asked for
        requested: Decimal,
        /// Policy minimum stake
        minimum: Decimal,
    },

    /// Unstake exceeds outstanding staked funds
    #[error("Unstake amount {requested} exceeds staked {staked}")]
    ExceedsStakedAmount {
        /// Amount the proposal asked for
        requested: Decimal,
        /// Funds currently staked
        staked: Decimal,
    },

    /// Daily reward already claimed within the current window
    #[error("Daily reward already claimed today")]
    AlreadyClaimedToday,

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Invariant violation (ledger equation, negative balance, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for typed policy rejections, false for infrastructure failures
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidAmount(_)
                | Error::InsufficientBalance { .. }
                | Error::BelowMinimumStake { .. }
                | Error::ExceedsStakedAmount { .. }
                | Error::AlreadyClaimedToday
        )
    }

    /// Stable label for metrics and logs
    pub fn reason(&self) -> &'static str {
        match self {
            Error::InvalidAmount(_) => "invalid_amount",
            Error::InsufficientBalance { .. } => "insufficient_balance",
            Error::BelowMinimumStake { .. } => "below_minimum_stake",
            Error::ExceedsStakedAmount { .. } => "exceeds_staked_amount",
            Error::AlreadyClaimedToday => "already_claimed_today",
            Error::TransactionNotFound(_) => "transaction_not_found",
            Error::Storage(_) => "storage",
            Error::Serialization(_) => "serialization",
            Error::InvariantViolation(_) => "invariant_violation",
            Error::Concurrency(_) => "concurrency",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
