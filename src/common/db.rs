use std::path::Path;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::common::errors::Result;

/// Creates the SQLite pool backing the transaction ledger and ensures the
/// schema exists. A single connection serializes concurrent writers;
/// synchronous=FULL makes `log_transaction` durable on return, so a crash
/// right after it still leaves the pending record recoverable.
pub async fn create_ledger_pool(ledger_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = ledger_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!("opening transaction ledger at {}", ledger_path.display());

    let options = SqliteConnectOptions::new()
        .filename(ledger_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            operation TEXT NOT NULL,
            status TEXT NOT NULL,
            user_approved BOOLEAN NOT NULL,
            metadata TEXT,
            rollback_info TEXT
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp)")
        .execute(&pool)
        .await?;

    Ok(pool)
}
