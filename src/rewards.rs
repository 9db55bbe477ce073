//! Daily reward and staking policy helpers
//!
//! Thin wrappers over [`Ledger::propose`] with the canonical sources. All
//! real rules live in the processor: the once-per-day window, the stake
//! minimum, and the unstake cap are enforced there even if a caller skips
//! these helpers.

use crate::{
    processor::{DAILY_REWARD_SOURCE, STAKING_SOURCE},
    types::{Account, TxKind, UserId},
    Ledger, Result,
};
use rust_decimal::Decimal;

/// Claim the daily login reward
///
/// Rejected with `AlreadyClaimedToday` if a claim was already accepted
/// within the current UTC day.
pub async fn claim_daily_reward(ledger: &Ledger, user_id: UserId) -> Result<Account> {
    let amount = ledger.config().policy.daily_reward;
    ledger
        .propose(
            user_id,
            TxKind::Earn,
            amount,
            DAILY_REWARD_SOURCE,
            Some("Daily login reward".to_string()),
        )
        .await
}

/// Lock funds into the staked counter
pub async fn stake(ledger: &Ledger, user_id: UserId, amount: Decimal) -> Result<Account> {
    ledger
        .propose(user_id, TxKind::Stake, amount, STAKING_SOURCE, None)
        .await
}

/// Release previously staked funds
pub async fn unstake(ledger: &Ledger, user_id: UserId, amount: Decimal) -> Result<Account> {
    ledger
        .propose(user_id, TxKind::Unstake, amount, STAKING_SOURCE, None)
        .await
}
