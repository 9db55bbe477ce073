//! Configuration for the token ledger

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Accounting policy configuration
    pub policy: PolicyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/token-ledger"),
            service_name: "token-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDBConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Target file size (MB)
    pub target_file_size_mb: u64,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            target_file_size_mb: 64,
            max_background_jobs: 4,
        }
    }
}

/// Accounting policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Balance granted to every account on first access
    pub initial_grant: Decimal,

    /// Minimum accepted stake amount
    pub min_stake: Decimal,

    /// Amount credited by a daily reward claim
    pub daily_reward: Decimal,

    /// Default page size for recent-transaction queries
    pub recent_page_size: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            initial_grant: Decimal::from(1000),
            min_stake: Decimal::from(100),
            daily_reward: Decimal::from(100),
            recent_page_size: 20,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("TOKEN_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(grant) = std::env::var("TOKEN_LEDGER_INITIAL_GRANT") {
            config.policy.initial_grant = grant
                .parse()
                .map_err(|_| crate::Error::Config(format!("Invalid initial grant: {}", grant)))?;
        }

        if let Ok(min_stake) = std::env::var("TOKEN_LEDGER_MIN_STAKE") {
            config.policy.min_stake = min_stake
                .parse()
                .map_err(|_| crate::Error::Config(format!("Invalid min stake: {}", min_stake)))?;
        }

        Ok(config)
    }
}
