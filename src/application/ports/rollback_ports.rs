use async_trait::async_trait;

use crate::common::errors::Result;

/// Port for the undo use case
#[async_trait]
pub trait RollbackUseCase: Send + Sync {
    /// Reverses a completed or failed transaction. Ok carries a
    /// human-readable success message; every refusal or failure is a typed
    /// error with its reason.
    async fn rollback_transaction(&self, transaction_id: i64) -> Result<String>;
}
