//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Current account snapshots (key: user id)
//! - `transactions` - Append-only transaction log (key: transaction id)
//! - `indices` - Time-ordered per-user index (key: len || user || nanos || seq)
//! - `meta` - Insertion sequence counter and last-source stamps
//!
//! Composite keys carry the user id length-prefixed. User ids are opaque
//! strings and may contain any byte, so a delimiter cannot bound them.

use crate::{
    error::{Error, Result},
    types::{Account, Transaction, UserId},
    Config,
};
use chrono::{DateTime, Utc};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode, Options,
    WriteBatch, DB,
};
use uuid::Uuid;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_TRANSACTIONS: &str = "transactions";
const CF_INDICES: &str = "indices";
const CF_META: &str = "meta";

/// Meta keys
const META_SEQ: &[u8] = b"seq";
const META_LAST_SOURCE_PREFIX: &[u8] = b"last_source";

/// Key separator after a fixed tag (never after a user-controlled part)
const KEY_SEP: u8 = 0x00;

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for the append-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_META, Self::cf_options_meta()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db })
    }

    // Column family options

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        // Accounts are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_meta() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Account operations

    /// Get account snapshot, if one exists
    pub fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;

        match self.db.get_cf(cf, user_id.as_bytes())? {
            Some(value) => {
                let account: Account = bincode::deserialize(&value)?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Put account snapshot (used for lazy creation; mutations go through [`Storage::commit`])
    pub fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = bincode::serialize(account)?;

        self.db.put_cf(cf, account.user_id.as_bytes(), &value)?;

        tracing::debug!(user_id = %account.user_id, "Account created");

        Ok(())
    }

    // Transaction operations

    /// Next insertion sequence number
    pub fn next_seq(&self) -> Result<u64> {
        let cf = self.cf_handle(CF_META)?;

        let seq = match self.db.get_cf(cf, META_SEQ)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("Corrupt seq counter".to_string()))?;
                u64::from_be_bytes(arr)
            }
            None => 0,
        };

        Ok(seq)
    }

    /// Commit an accepted transaction and the updated account atomically
    ///
    /// One WriteBatch carries the account snapshot, the transaction record,
    /// its time-index entry, the last-source stamp, and the seq bump. A
    /// ledger entry can never exist without its balance update.
    pub fn commit(&self, account: &Account, tx: &Transaction) -> Result<()> {
        let mut batch = WriteBatch::default();

        // 1. Account snapshot
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let account_value = bincode::serialize(account)?;
        batch.put_cf(cf_accounts, account.user_id.as_bytes(), &account_value);

        // 2. Transaction record
        let cf_txs = self.cf_handle(CF_TRANSACTIONS)?;
        let tx_value = bincode::serialize(tx)?;
        batch.put_cf(cf_txs, tx.id.as_bytes(), &tx_value);

        // 3. Time index: len || user || nanos || seq -> tx id
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let idx_key = Self::index_key(&tx.user_id, tx.created_at, tx.seq);
        batch.put_cf(cf_indices, &idx_key, tx.id.as_bytes());

        // 4. Last-source stamp: last_source || len || user || source -> nanos
        let cf_meta = self.cf_handle(CF_META)?;
        let src_key = Self::last_source_key(&tx.user_id, &tx.source);
        let nanos = tx.created_at.timestamp_nanos_opt().unwrap_or(0);
        batch.put_cf(cf_meta, &src_key, nanos.to_be_bytes());

        // 5. Seq bump
        batch.put_cf(cf_meta, META_SEQ, (tx.seq + 1).to_be_bytes());

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(
            tx_id = %tx.id,
            user_id = %tx.user_id,
            kind = %tx.kind,
            amount = %tx.amount,
            "Transaction committed"
        );

        Ok(())
    }

    /// Get transaction by ID
    pub fn get_transaction(&self, tx_id: Uuid) -> Result<Transaction> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let value = self
            .db
            .get_cf(cf, tx_id.as_bytes())?
            .ok_or_else(|| Error::TransactionNotFound(tx_id.to_string()))?;

        let tx: Transaction = bincode::deserialize(&value)?;
        Ok(tx)
    }

    /// Most recent `limit` transactions for a user
    ///
    /// Ordered by `created_at` descending; within an equal-timestamp run,
    /// insertion order is preserved (ascending seq).
    pub fn recent_transactions(&self, user_id: &UserId, limit: usize) -> Result<Vec<Transaction>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::user_key_prefix(user_id);

        // Reverse scan from just past the prefix range
        let mut upper = prefix.clone();
        upper.extend_from_slice(&[0xFF; 17]);

        let iter = self
            .db
            .iterator_cf(cf_indices, IteratorMode::From(upper.as_slice(), Direction::Reverse));

        let mut txs = Vec::with_capacity(limit);
        for item in iter {
            let (key, value) = item?;

            if !key.starts_with(&prefix) {
                break;
            }
            if txs.len() >= limit {
                break;
            }

            let tx_id_bytes: [u8; 16] = value
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Corrupt index entry".to_string()))?;
            let tx = self.get_transaction(Uuid::from_bytes(tx_id_bytes))?;
            txs.push(tx);
        }

        // The reverse scan yields equal-timestamp runs in reverse insertion
        // order; restore insertion order within each run.
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.seq.cmp(&b.seq)));

        Ok(txs)
    }

    /// Timestamp of the most recent accepted transaction with a given source
    pub fn last_accepted_at(&self, user_id: &UserId, source: &str) -> Result<Option<DateTime<Utc>>> {
        let cf = self.cf_handle(CF_META)?;
        let key = Self::last_source_key(user_id, source);

        match self.db.get_cf(cf, &key)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("Corrupt last-source stamp".to_string()))?;
                let nanos = i64::from_be_bytes(arr);
                Ok(Some(DateTime::from_timestamp_nanos(nanos)))
            }
            None => Ok(None),
        }
    }

    // Key helpers
    //
    // The length prefix bounds the user id without relying on a delimiter
    // byte the id itself could contain; keys for one user stay contiguous
    // and can never alias another user's.

    fn user_key_prefix(user_id: &UserId) -> Vec<u8> {
        let bytes = user_id.as_bytes();
        let mut key = Vec::with_capacity(4 + bytes.len());
        key.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        key.extend_from_slice(bytes);
        key
    }

    fn index_key(user_id: &UserId, created_at: DateTime<Utc>, seq: u64) -> Vec<u8> {
        let nanos = created_at.timestamp_nanos_opt().unwrap_or(0);
        let mut key = Self::user_key_prefix(user_id);
        key.extend_from_slice(&nanos.to_be_bytes());
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    fn last_source_key(user_id: &UserId, source: &str) -> Vec<u8> {
        let mut key = META_LAST_SOURCE_PREFIX.to_vec();
        key.push(KEY_SEP);
        key.extend_from_slice(&Self::user_key_prefix(user_id));
        key.extend_from_slice(source.as_bytes());
        key
    }

    // Statistics

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let cf_txs = self.cf_handle(CF_TRANSACTIONS)?;

        Ok(StorageStats {
            total_accounts: self.approximate_count(cf_accounts)?,
            total_transactions: self.approximate_count(cf_txs)?,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate number of accounts
    pub total_accounts: u64,
    /// Approximate number of transactions
    pub total_transactions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TxKind;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_account(user: &str) -> Account {
        Account::with_initial_grant(UserId::new(user), Decimal::from(1000), Utc::now())
    }

    fn test_tx(user: &str, seq: u64, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: Uuid::now_v7(),
            user_id: UserId::new(user),
            kind: TxKind::Earn,
            amount: Decimal::from(100),
            source: "daily_reward".to_string(),
            description: None,
            created_at,
            seq,
        }
    }

    #[test]
    fn test_account_round_trip() {
        let (storage, _temp) = test_storage();
        let account = test_account("u1");

        assert!(storage.get_account(&account.user_id).unwrap().is_none());
        storage.put_account(&account).unwrap();

        let retrieved = storage.get_account(&account.user_id).unwrap().unwrap();
        assert_eq!(retrieved, account);
    }

    #[test]
    fn test_commit_is_atomic_pair() {
        let (storage, _temp) = test_storage();
        let mut account = test_account("u1");
        let tx = test_tx("u1", 0, Utc::now());

        account.balance += tx.amount;
        account.total_earned += tx.amount;
        storage.commit(&account, &tx).unwrap();

        let stored_account = storage.get_account(&account.user_id).unwrap().unwrap();
        assert_eq!(stored_account.balance, Decimal::from(1100));

        let stored_tx = storage.get_transaction(tx.id).unwrap();
        assert_eq!(stored_tx, tx);

        assert_eq!(storage.next_seq().unwrap(), 1);
    }

    #[test]
    fn test_recent_ordering_and_limit() {
        let (storage, _temp) = test_storage();
        let account = test_account("u1");
        let base = Utc::now();

        // Three distinct timestamps, committed in order
        for (seq, secs) in [(0u64, 0i64), (1, 1), (2, 2)] {
            let tx = test_tx("u1", seq, base + Duration::seconds(secs));
            storage.commit(&account, &tx).unwrap();
        }

        let txs = storage.recent_transactions(&account.user_id, 2).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].seq, 2); // newest first
        assert_eq!(txs[1].seq, 1);
    }

    #[test]
    fn test_recent_equal_timestamps_keep_insertion_order() {
        let (storage, _temp) = test_storage();
        let account = test_account("u1");
        let at = Utc::now();

        for seq in 0u64..3 {
            let tx = test_tx("u1", seq, at);
            storage.commit(&account, &tx).unwrap();
        }

        let txs = storage.recent_transactions(&account.user_id, 10).unwrap();
        let seqs: Vec<u64> = txs.iter().map(|t| t.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_recent_is_per_user() {
        let (storage, _temp) = test_storage();
        let a = test_account("alice");
        let b = test_account("bob");

        storage.commit(&a, &test_tx("alice", 0, Utc::now())).unwrap();
        storage.commit(&b, &test_tx("bob", 1, Utc::now())).unwrap();

        let txs = storage.recent_transactions(&a.user_id, 20).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].user_id, a.user_id);
    }

    #[test]
    fn test_nul_bytes_in_user_id_do_not_alias_scans() {
        let (storage, _temp) = test_storage();
        let plain = test_account("a");
        let tricky = test_account("a\0b");

        storage
            .commit(&tricky, &test_tx("a\0b", 0, Utc::now()))
            .unwrap();

        // "a" must not see "a\0b"'s history
        assert!(storage
            .recent_transactions(&plain.user_id, 20)
            .unwrap()
            .is_empty());
        assert_eq!(
            storage
                .recent_transactions(&tricky.user_id, 20)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_nul_bytes_in_user_id_do_not_alias_source_stamps() {
        let (storage, _temp) = test_storage();
        let tricky = test_account("a\0b");

        // user "a\0b" + source "daily_reward" must not be readable as
        // user "a" + source "b\0daily_reward" (or any other split)
        storage
            .commit(&tricky, &test_tx("a\0b", 0, Utc::now()))
            .unwrap();

        assert!(storage
            .last_accepted_at(&tricky.user_id, "daily_reward")
            .unwrap()
            .is_some());
        assert!(storage
            .last_accepted_at(&UserId::new("a"), "b\0daily_reward")
            .unwrap()
            .is_none());
        assert!(storage
            .last_accepted_at(&UserId::new("a\0b\0daily"), "_reward")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_last_accepted_at() {
        let (storage, _temp) = test_storage();
        let account = test_account("u1");
        let at = Utc::now();

        assert!(storage
            .last_accepted_at(&account.user_id, "daily_reward")
            .unwrap()
            .is_none());

        storage.commit(&account, &test_tx("u1", 0, at)).unwrap();

        let stamped = storage
            .last_accepted_at(&account.user_id, "daily_reward")
            .unwrap()
            .unwrap();
        assert_eq!(
            stamped.timestamp_nanos_opt().unwrap(),
            at.timestamp_nanos_opt().unwrap()
        );
        assert!(storage
            .last_accepted_at(&account.user_id, "staking")
            .unwrap()
            .is_none());
    }
}
