//! Transaction decision core
//!
//! [`decide`] is a pure function from (policy, account snapshot, proposal)
//! to either an [`Effect`] or a typed rejection. It mutates nothing; the
//! single-writer actor applies the effect and commits atomically.
//!
//! Validation order, short-circuiting on first failure:
//! 1. amount must be positive
//! 2. spend/stake must fit within the available balance
//! 3. stake must meet the policy minimum
//! 4. unstake must not exceed outstanding staked funds
//! 5. a daily-reward earn must fall outside the current reward window

use crate::{
    config::PolicyConfig,
    types::{Account, Effect, TxKind},
    Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Source label for daily reward claims
pub const DAILY_REWARD_SOURCE: &str = "daily_reward";

/// Source label for staking operations
pub const STAKING_SOURCE: &str = "staking";

/// Decide whether a proposal is accepted, producing its effect
pub fn decide(
    policy: &PolicyConfig,
    account: &Account,
    kind: TxKind,
    amount: Decimal,
    source: &str,
    last_daily_reward_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Effect> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(amount));
    }

    match kind {
        TxKind::Earn => {
            if source == DAILY_REWARD_SOURCE {
                if let Some(last) = last_daily_reward_at {
                    if same_reward_window(last, now) {
                        return Err(Error::AlreadyClaimedToday);
                    }
                }
            }
            Ok(Effect {
                balance: amount,
                total_earned: amount,
                total_spent: Decimal::ZERO,
                staked: Decimal::ZERO,
            })
        }

        TxKind::Spend => {
            if amount > account.balance {
                return Err(Error::InsufficientBalance {
                    requested: amount,
                    available: account.balance,
                });
            }
            Ok(Effect {
                balance: -amount,
                total_earned: Decimal::ZERO,
                total_spent: amount,
                staked: Decimal::ZERO,
            })
        }

        TxKind::Stake => {
            if amount > account.balance {
                return Err(Error::InsufficientBalance {
                    requested: amount,
                    available: account.balance,
                });
            }
            if amount < policy.min_stake {
                return Err(Error::BelowMinimumStake {
                    requested: amount,
                    minimum: policy.min_stake,
                });
            }
            Ok(Effect {
                balance: -amount,
                total_earned: Decimal::ZERO,
                total_spent: amount,
                staked: amount,
            })
        }

        TxKind::Unstake => {
            if amount > account.staked {
                return Err(Error::ExceedsStakedAmount {
                    requested: amount,
                    staked: account.staked,
                });
            }
            // Reverses exactly the stake's lock: the refund to total_spent
            // keeps balance == total_earned - total_spent.
            Ok(Effect {
                balance: amount,
                total_earned: Decimal::ZERO,
                total_spent: -amount,
                staked: -amount,
            })
        }
    }
}

/// Whether two instants fall in the same daily reward window (UTC calendar day)
pub fn same_reward_window(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}
