use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::{debug, instrument};

use crate::common::errors::{DomainError, Result};
use crate::domain::entities::transaction::{
    FsOperation, RollbackInfo, Transaction, TransactionMetadata, TransactionStatus,
};
use crate::domain::repositories::transaction_repository::{
    TransactionFilter, TransactionRepository, TransactionUpdate,
};

const TRANSACTION_COLUMNS: &str =
    "id, timestamp, operation, status, user_approved, metadata, rollback_info";

/// SQLite-backed transaction ledger
pub struct TransactionSqliteRepository {
    pool: SqlitePool,
}

impl TransactionSqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let timestamp: String = row.try_get("timestamp")?;
        let operation: String = row.try_get("operation")?;
        let status: String = row.try_get("status")?;
        let metadata: Option<String> = row.try_get("metadata")?;
        let rollback_info: Option<String> = row.try_get("rollback_info")?;

        Ok(Transaction {
            id: row.try_get("id")?,
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| {
                    DomainError::internal_error(
                        "Transaction",
                        format!("corrupt timestamp '{}': {}", timestamp, e),
                    )
                })?
                .with_timezone(&Utc),
            operation: operation.parse()?,
            status: status.parse()?,
            user_approved: row.try_get("user_approved")?,
            metadata: metadata
                .map(|json| serde_json::from_str::<TransactionMetadata>(&json))
                .transpose()?,
            rollback_info: rollback_info
                .map(|json| serde_json::from_str::<RollbackInfo>(&json))
                .transpose()?,
        })
    }
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl TransactionRepository for TransactionSqliteRepository {
    #[instrument(skip(self, metadata, rollback_info))]
    async fn log_transaction(
        &self,
        operation: FsOperation,
        status: TransactionStatus,
        user_approved: bool,
        metadata: Option<TransactionMetadata>,
        rollback_info: Option<RollbackInfo>,
    ) -> Result<i64> {
        let metadata_json = metadata.map(|m| serde_json::to_string(&m)).transpose()?;
        let rollback_json = rollback_info
            .map(|r| serde_json::to_string(&r))
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO transactions (timestamp, operation, status, user_approved, metadata, rollback_info)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(encode_timestamp(Utc::now()))
        .bind(operation.to_string())
        .bind(status.to_string())
        .bind(user_approved)
        .bind(metadata_json)
        .bind(rollback_json)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("logged {} transaction {} as {}", operation, id, status);
        Ok(id)
    }

    #[instrument(skip(self, update))]
    async fn update_transaction(&self, id: i64, update: TransactionUpdate) -> Result<()> {
        if update.status.is_none() && update.metadata.is_none() && update.rollback_info.is_none() {
            return Ok(());
        }

        let guard_status = match update.status {
            Some(next) => {
                let current = self.get_transaction(id).await?.status;
                if !current.can_transition_to(next) {
                    return Err(DomainError::conflict(
                        "Transaction",
                        format!(
                            "illegal status transition for transaction {}: {} -> {}",
                            id, current, next
                        ),
                    ));
                }
                Some(current)
            }
            None => None,
        };

        let mut assignments = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(status) = update.status {
            assignments.push("status = ?");
            values.push(status.to_string());
        }
        if let Some(metadata) = &update.metadata {
            assignments.push("metadata = ?");
            values.push(serde_json::to_string(metadata)?);
        }
        if let Some(rollback_info) = &update.rollback_info {
            assignments.push("rollback_info = ?");
            values.push(serde_json::to_string(rollback_info)?);
        }

        // Guarding on the observed status makes the transition check atomic:
        // a writer that lost a race affects zero rows instead of overwriting
        let mut sql = format!(
            "UPDATE transactions SET {} WHERE id = ?",
            assignments.join(", ")
        );
        if guard_status.is_some() {
            sql.push_str(" AND status = ?");
        }
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = query.bind(value);
        }
        query = query.bind(id);
        if let Some(current) = guard_status {
            query = query.bind(current.to_string());
        }
        let result = query.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            // Gone entirely, or another writer changed the status first
            let current = self.get_transaction(id).await?.status;
            return Err(DomainError::conflict(
                "Transaction",
                format!(
                    "transaction {} changed concurrently: status is now {}",
                    id, current
                ),
            ));
        }
        Ok(())
    }

    async fn get_transaction(&self, id: i64) -> Result<Transaction> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_transaction(&row),
            None => Err(DomainError::not_found("Transaction", id.to_string())),
        }
    }

    async fn list_transactions(&self, filter: TransactionFilter) -> Result<Vec<Transaction>> {
        let mut sql = format!(
            "SELECT {} FROM transactions WHERE 1=1",
            TRANSACTION_COLUMNS
        );
        if filter.operation.is_some() {
            sql.push_str(" AND operation = ?");
        }
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY id DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(operation) = filter.operation {
            query = query.bind(operation.to_string());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.to_string());
        }
        let rows = query
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn get_recent_transactions(&self, days: u32, limit: i64) -> Result<Vec<Transaction>> {
        let cutoff = encode_timestamp(Utc::now() - Duration::days(days as i64));
        let sql = format!(
            "SELECT {} FROM transactions WHERE timestamp >= ? ORDER BY id DESC LIMIT ?",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }
}
