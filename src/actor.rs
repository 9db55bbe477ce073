//! Actor-based concurrency for the ledger
//!
//! All mutations flow through one Tokio task (single-writer pattern).
//! Concurrent proposals for the same account serialize in arrival order,
//! so two overlapping spends can never both pass the sufficiency check
//! against a stale balance.
//!
//! ```text
//! callers ──► LedgerHandle (Clone) ──mpsc──► LedgerActor ──► Storage
//!                                            (one task,      (atomic
//!                                             owns writes)    WriteBatch)
//! ```
//!
//! Reads of the transaction log bypass the actor; account reads go through
//! it because first access lazily creates the account.

use crate::{
    metrics::Metrics,
    processor::{self, DAILY_REWARD_SOURCE},
    types::{Account, Transaction, TxKind, UserId},
    Config, Error, Result, Storage,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Propose a transaction
    Propose {
        /// Account owner
        user_id: UserId,
        /// Transaction kind
        kind: TxKind,
        /// Proposed amount
        amount: Decimal,
        /// Causing activity label
        source: String,
        /// Optional human-readable note
        description: Option<String>,
        /// Updated account snapshot on acceptance, typed rejection otherwise
        response: oneshot::Sender<Result<Account>>,
    },

    /// Get account, creating it with the starting grant on first access
    GetAccount {
        /// Account owner
        user_id: UserId,
        /// Account snapshot
        response: oneshot::Sender<Result<Account>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Accounting policy
    policy: crate::config::PolicyConfig,

    /// Metrics collector
    metrics: Metrics,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        policy: crate::config::PolicyConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            mailbox,
            policy,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                _ => self.handle_message(msg),
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Propose {
                user_id,
                kind,
                amount,
                source,
                description,
                response,
            } => {
                let started = Instant::now();
                let result = self.handle_propose(user_id, kind, amount, source, description);
                self.metrics
                    .record_propose_duration(started.elapsed().as_secs_f64());
                let _ = response.send(result);
            }

            LedgerMessage::GetAccount { user_id, response } => {
                let result = self.get_or_create(&user_id).map(|(account, _)| account);
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Fetch the account, creating it with the starting grant if absent
    fn get_or_create(&self, user_id: &UserId) -> Result<(Account, bool)> {
        if let Some(account) = self.storage.get_account(user_id)? {
            return Ok((account, false));
        }

        let account = Account::with_initial_grant(
            user_id.clone(),
            self.policy.initial_grant,
            Utc::now(),
        );
        self.storage.put_account(&account)?;
        self.metrics.record_account_created();

        tracing::info!(user_id = %user_id, grant = %self.policy.initial_grant, "Account created");

        Ok((account, true))
    }

    /// Validate, apply, and commit one proposal
    fn handle_propose(
        &self,
        user_id: UserId,
        kind: TxKind,
        amount: Decimal,
        source: String,
        description: Option<String>,
    ) -> Result<Account> {
        let result = self.try_propose(user_id.clone(), kind, amount, source, description);

        if let Err(err) = &result {
            if err.is_rejection() {
                self.metrics.record_rejected(err.reason());
                tracing::debug!(
                    user_id = %user_id,
                    kind = %kind,
                    amount = %amount,
                    reason = err.reason(),
                    "Proposal rejected"
                );
            }
        }

        result
    }

    fn try_propose(
        &self,
        user_id: UserId,
        kind: TxKind,
        amount: Decimal,
        source: String,
        description: Option<String>,
    ) -> Result<Account> {
        // The amount gate comes before the account fetch: an invalid
        // proposal from a never-seen user must not trigger lazy creation.
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(amount));
        }

        let (account, _) = self.get_or_create(&user_id)?;

        // Only the daily-reward window check needs history
        let last_daily = if kind == TxKind::Earn && source == DAILY_REWARD_SOURCE {
            self.storage.last_accepted_at(&user_id, DAILY_REWARD_SOURCE)?
        } else {
            None
        };

        let now = Utc::now();
        let effect = processor::decide(
            &self.policy,
            &account,
            kind,
            amount,
            &source,
            last_daily,
            now,
        )?;

        let mut updated = account;
        updated.apply_effect(&effect, now)?;

        let tx = Transaction {
            id: Uuid::now_v7(),
            user_id,
            kind,
            amount,
            source,
            description,
            created_at: now,
            seq: self.storage.next_seq()?,
        };

        // Account snapshot and ledger entry land in one atomic batch
        self.storage.commit(&updated, &tx)?;
        self.metrics.record_accepted(kind);

        Ok(updated)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Propose a transaction
    pub async fn propose(
        &self,
        user_id: UserId,
        kind: TxKind,
        amount: Decimal,
        source: impl Into<String>,
        description: Option<String>,
    ) -> Result<Account> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Propose {
                user_id,
                kind,
                amount,
                source: source.into(),
                description,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get account, lazily creating it
    pub async fn get_account(&self, user_id: UserId) -> Result<Account> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::GetAccount {
                user_id,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    storage: Arc<Storage>,
    config: &Config,
    metrics: Metrics,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, rx, config.policy.clone(), metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
