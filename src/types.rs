//! Core types for the token ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for token amounts)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User identifier owning an account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get as raw bytes (storage key)
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction kind (closed set; anything else is rejected at the boundary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TxKind {
    /// Credit from an earning activity (login reward, referral, ...)
    Earn = 1,
    /// Debit for a purchase or redemption
    Spend = 2,
    /// Debit that locks funds into the staked counter
    Stake = 3,
    /// Credit that releases previously staked funds
    Unstake = 4,
}

impl TxKind {
    /// Wire/display label
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Earn => "earn",
            TxKind::Spend => "spend",
            TxKind::Stake => "stake",
            TxKind::Unstake => "unstake",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "earn" => Some(TxKind::Earn),
            "spend" => Some(TxKind::Spend),
            "stake" => Some(TxKind::Stake),
            "unstake" => Some(TxKind::Unstake),
            _ => None,
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One accepted, immutable balance-changing event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Account this transaction belongs to
    pub user_id: UserId,

    /// Transaction kind
    pub kind: TxKind,

    /// Token amount (exact decimal, always positive)
    pub amount: Decimal,

    /// Machine-readable label for the causing activity
    /// (e.g. `daily_reward`, `staking`, `purchase`)
    pub source: String,

    /// Optional human-readable note
    pub description: Option<String>,

    /// Acceptance timestamp
    pub created_at: DateTime<Utc>,

    /// Insertion sequence assigned by the single writer.
    /// Breaks ties between transactions with equal `created_at`.
    pub seq: u64,
}

/// Signed deltas produced by an accepted proposal
///
/// Exactly one of these is produced per acceptance; rejections produce none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    /// Delta to available balance
    pub balance: Decimal,
    /// Delta to lifetime earned total (never negative)
    pub total_earned: Decimal,
    /// Delta to lifetime spent total (negative only for unstake refunds)
    pub total_spent: Decimal,
    /// Delta to the locked staked counter
    pub staked: Decimal,
}

/// Per-user account snapshot: available balance plus lifetime aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Owning user
    pub user_id: UserId,

    /// Funds currently available to spend or stake
    pub balance: Decimal,

    /// Cumulative sum of all earn amounts, including the initial grant
    pub total_earned: Decimal,

    /// Cumulative sum of spend and outstanding stake amounts
    pub total_spent: Decimal,

    /// Funds currently staked and not yet unstaked
    pub staked: Decimal,

    /// Creation timestamp (first access)
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh account carrying the starting grant
    ///
    /// The grant counts toward `total_earned` but writes no ledger entry;
    /// ledger entries come only from accepted proposals.
    pub fn with_initial_grant(user_id: UserId, grant: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance: grant,
            total_earned: grant,
            total_spent: Decimal::ZERO,
            staked: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an accepted effect and re-check invariants
    pub fn apply_effect(&mut self, effect: &Effect, now: DateTime<Utc>) -> crate::Result<()> {
        self.balance += effect.balance;
        self.total_earned += effect.total_earned;
        self.total_spent += effect.total_spent;
        self.staked += effect.staked;
        self.updated_at = now;

        self.check_invariants()
    }

    /// Verify the accounting invariants hold
    ///
    /// - all four numeric fields are non-negative
    /// - `balance == total_earned - total_spent`
    pub fn check_invariants(&self) -> crate::Result<()> {
        if self.balance < Decimal::ZERO {
            return Err(crate::Error::InvariantViolation(format!(
                "negative balance {} for {}",
                self.balance, self.user_id
            )));
        }
        if self.total_earned < Decimal::ZERO || self.total_spent < Decimal::ZERO {
            return Err(crate::Error::InvariantViolation(format!(
                "negative lifetime total for {}",
                self.user_id
            )));
        }
        if self.staked < Decimal::ZERO {
            return Err(crate::Error::InvariantViolation(format!(
                "negative staked amount {} for {}",
                self.staked, self.user_id
            )));
        }
        if self.balance != self.total_earned - self.total_spent {
            return Err(crate::Error::InvariantViolation(format!(
                "balance {} != earned {} - spent {} for {}",
                self.balance, self.total_earned, self.total_spent, self.user_id
            )));
        }
        Ok(())
    }
}
