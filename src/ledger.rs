//! Main ledger orchestration layer
//!
//! Ties storage, the decision core, and the single-writer actor into the
//! engine's external surface: `get_account`, `propose`, and
//! `recent_transactions`.
//!
//! # Example
//!
//! ```no_run
//! use token_ledger::{Config, Ledger, TxKind, UserId};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> token_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!
//!     let user = UserId::new("user-42");
//!     let account = ledger.get_account(user.clone()).await?;
//!     assert_eq!(account.balance, Decimal::from(1000));
//!
//!     ledger
//!         .propose(user, TxKind::Earn, Decimal::from(100), "referral", None)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    metrics::Metrics,
    storage::StorageStats,
    types::{Account, Transaction, TxKind, UserId},
    Config, Result, Storage,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for mutations and lazy-creating reads
    handle: LedgerHandle,

    /// Direct storage access (pure reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new()
            .map_err(|e| crate::Error::Config(format!("Failed to create metrics: {}", e)))?;

        let handle = spawn_ledger_actor(storage.clone(), &config, metrics.clone());

        Ok(Self {
            handle,
            storage,
            metrics,
            config,
        })
    }

    /// Get account snapshot, creating it with the starting grant on first access
    pub async fn get_account(&self, user_id: UserId) -> Result<Account> {
        self.handle.get_account(user_id).await
    }

    /// Propose a transaction
    ///
    /// On acceptance the updated account snapshot is returned and exactly one
    /// ledger entry is appended, atomically with the balance update. On
    /// rejection nothing is mutated and the caller receives the typed reason.
    pub async fn propose(
        &self,
        user_id: UserId,
        kind: TxKind,
        amount: Decimal,
        source: impl Into<String>,
        description: Option<String>,
    ) -> Result<Account> {
        self.handle
            .propose(user_id, kind, amount, source, description)
            .await
    }

    /// Most recent transactions for a user, newest first
    ///
    /// `limit` defaults to the configured page size when `None`. This read
    /// path runs concurrently with writes and observes either the pre- or
    /// post-commit state, never a partial one.
    pub fn recent_transactions(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let limit = limit.unwrap_or(self.config.policy.recent_page_size);
        self.storage.recent_transactions(user_id, limit)
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    async fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Ledger::open(config).unwrap(), temp_dir)
    }

    #[tokio::test]
    async fn test_new_account_carries_starting_grant() {
        let (ledger, _temp) = create_test_ledger().await;

        let account = ledger.get_account(UserId::new("u1")).await.unwrap();
        assert_eq!(account.balance, Decimal::from(1000));
        assert_eq!(account.total_earned, Decimal::from(1000));
        assert_eq!(account.total_spent, Decimal::ZERO);

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_earn_appends_one_entry() {
        let (ledger, _temp) = create_test_ledger().await;
        let user = UserId::new("u1");

        let account = ledger
            .propose(
                user.clone(),
                TxKind::Earn,
                Decimal::from(100),
                "daily_reward",
                None,
            )
            .await
            .unwrap();
        assert_eq!(account.balance, Decimal::from(1100));
        assert_eq!(account.total_earned, Decimal::from(1100));
        assert_eq!(account.total_spent, Decimal::ZERO);

        let txs = ledger.recent_transactions(&user, None).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, TxKind::Earn);
        assert_eq!(txs[0].amount, Decimal::from(100));
        assert_eq!(txs[0].source, "daily_reward");

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stake_then_unstake_round_trip() {
        let (ledger, _temp) = create_test_ledger().await;
        let user = UserId::new("u1");

        // Earn first so the round trip starts from 1100
        ledger
            .propose(
                user.clone(),
                TxKind::Earn,
                Decimal::from(100),
                "daily_reward",
                None,
            )
            .await
            .unwrap();

        let staked = ledger
            .propose(
                user.clone(),
                TxKind::Stake,
                Decimal::from(200),
                "staking",
                None,
            )
            .await
            .unwrap();
        assert_eq!(staked.balance, Decimal::from(900));
        assert_eq!(staked.staked, Decimal::from(200));

        let unstaked = ledger
            .propose(
                user.clone(),
                TxKind::Unstake,
                Decimal::from(200),
                "staking",
                None,
            )
            .await
            .unwrap();
        assert_eq!(unstaked.balance, Decimal::from(1100));
        assert_eq!(unstaked.staked, Decimal::ZERO);
        unstaked.check_invariants().unwrap();

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_small_stake_rejected_below_minimum() {
        let (ledger, _temp) = create_test_ledger().await;
        let user = UserId::new("u1");

        let before = ledger.get_account(user.clone()).await.unwrap();
        let result = ledger
            .propose(
                user.clone(),
                TxKind::Stake,
                Decimal::from(50),
                "staking",
                None,
            )
            .await;
        assert!(matches!(result, Err(Error::BelowMinimumStake { .. })));

        let after = ledger.get_account(user.clone()).await.unwrap();
        assert_eq!(after, before);
        assert!(ledger.recent_transactions(&user, None).unwrap().is_empty());

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_overdraw_spend_rejected() {
        let (ledger, _temp) = create_test_ledger().await;
        let user = UserId::new("u1");

        let result = ledger
            .propose(
                user.clone(),
                TxKind::Spend,
                Decimal::from(2000),
                "purchase",
                None,
            )
            .await;
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));

        let account = ledger.get_account(user).await.unwrap();
        assert_eq!(account.balance, Decimal::from(1000));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_recent_page_is_newest_first() {
        let (ledger, _temp) = create_test_ledger().await;
        let user = UserId::new("u1");

        for source in ["login", "referral", "loan_activity"] {
            ledger
                .propose(user.clone(), TxKind::Earn, Decimal::from(10), source, None)
                .await
                .unwrap();
        }

        let txs = ledger.recent_transactions(&user, Some(2)).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].source, "loan_activity");
        assert_eq!(txs[1].source, "referral");
        assert!(txs[0].created_at >= txs[1].created_at);

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_metrics_reflect_outcomes() {
        let (ledger, _temp) = create_test_ledger().await;
        let user = UserId::new("u1");

        ledger
            .propose(user.clone(), TxKind::Earn, Decimal::from(10), "login", None)
            .await
            .unwrap();
        let _ = ledger
            .propose(user, TxKind::Spend, Decimal::from(9999), "purchase", None)
            .await;

        let metrics = ledger.metrics();
        assert_eq!(
            metrics.accepted_total.with_label_values(&["earn"]).get(),
            1
        );
        assert_eq!(
            metrics
                .rejected_total
                .with_label_values(&["insufficient_balance"])
                .get(),
            1
        );

        ledger.shutdown().await.unwrap();
    }
}
