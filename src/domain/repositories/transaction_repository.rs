use async_trait::async_trait;

use crate::common::errors::Result;
use crate::domain::entities::transaction::{
    FsOperation, RollbackInfo, Transaction, TransactionMetadata, TransactionStatus,
};

/// Partial update of a transaction; fields left as `None` are untouched so a
/// status-only update can never overwrite metadata with null.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub status: Option<TransactionStatus>,
    pub metadata: Option<TransactionMetadata>,
    pub rollback_info: Option<RollbackInfo>,
}

impl TransactionUpdate {
    pub fn status(status: TransactionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, metadata: TransactionMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_rollback_info(mut self, rollback_info: RollbackInfo) -> Self {
        self.rollback_info = Some(rollback_info);
        self
    }
}

/// Filter for listing transactions; results are always newest-first
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub operation: Option<FsOperation>,
    pub status: Option<TransactionStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            operation: None,
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Durable, queryable ledger of every mutation attempt and its outcome.
/// `log_transaction` must be durable on return: the caller only begins the
/// physical mutation once the pending record is on disk.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Inserts a new transaction and returns its id
    async fn log_transaction(
        &self,
        operation: FsOperation,
        status: TransactionStatus,
        user_approved: bool,
        metadata: Option<TransactionMetadata>,
        rollback_info: Option<RollbackInfo>,
    ) -> Result<i64>;

    /// Applies a partial update; illegal status transitions are rejected
    async fn update_transaction(&self, id: i64, update: TransactionUpdate) -> Result<()>;

    /// Fetches a transaction by id
    async fn get_transaction(&self, id: i64) -> Result<Transaction>;

    /// Lists transactions newest-first with optional operation/status filters
    async fn list_transactions(&self, filter: TransactionFilter) -> Result<Vec<Transaction>>;

    /// Lists transactions newer than `now - days`, newest-first
    async fn get_recent_transactions(&self, days: u32, limit: i64) -> Result<Vec<Transaction>>;
}
