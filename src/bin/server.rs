//! Token ledger daemon binary

use anyhow::Context;
use token_ledger::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting token ledger");

    // Load configuration
    let config = Config::from_env().context("failed to load configuration")?;

    // Open ledger
    let ledger = Ledger::open(config).context("failed to open ledger")?;
    let stats = ledger.stats().context("failed to read storage stats")?;
    tracing::info!(
        accounts = stats.total_accounts,
        transactions = stats.total_transactions,
        "Ledger opened"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down token ledger");
    ledger.shutdown().await?;
    Ok(())
}
