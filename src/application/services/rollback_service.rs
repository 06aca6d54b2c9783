use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

use crate::application::ports::rollback_ports::RollbackUseCase;
use crate::common::errors::{DomainError, Result};
use crate::common::fsutil::move_path;
use crate::domain::entities::transaction::{
    FsOperation, OperationPayload, RollbackInfo, Transaction, TransactionStatus,
};
use crate::domain::repositories::transaction_repository::{
    TransactionRepository, TransactionUpdate,
};
use crate::domain::repositories::trash_repository::TrashRepository;

/// Executes the operation-specific reversal of a transaction using the
/// ledger and the trash store. The ledger is only marked `rolled_back`
/// after the physical reversal succeeded.
pub struct RollbackService {
    ledger: Arc<dyn TransactionRepository>,
    trash: Arc<dyn TrashRepository>,
}

impl RollbackService {
    pub fn new(ledger: Arc<dyn TransactionRepository>, trash: Arc<dyn TrashRepository>) -> Self {
        Self { ledger, trash }
    }

    /// Reverses a copy by deleting the recorded destination files. The
    /// source is never touched; a destination that is already gone is fine.
    async fn rollback_copy(&self, transaction: &Transaction) -> Result<()> {
        let Some(metadata) = &transaction.metadata else {
            return Err(DomainError::validation_error(
                "Transaction",
                format!("transaction {} has no copy metadata", transaction.id),
            ));
        };
        let OperationPayload::Copy { copied_files, .. } = &metadata.payload else {
            return Err(DomainError::validation_error(
                "Transaction",
                format!("transaction {} metadata is not a copy payload", transaction.id),
            ));
        };

        let mut failures = Vec::new();
        for file in copied_files {
            match fs::try_exists(&file.destination).await {
                Ok(false) => {
                    debug!("copy destination already absent: {}", file.destination.display());
                }
                Ok(true) => {
                    if let Err(e) = fs::remove_file(&file.destination).await {
                        error!("failed to delete {}: {}", file.destination.display(), e);
                        failures.push(format!("{}: {}", file.destination.display(), e));
                    } else {
                        debug!("deleted copied file: {}", file.destination.display());
                    }
                }
                Err(e) => {
                    failures.push(format!("{}: {}", file.destination.display(), e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DomainError::partial_failure(
                "Transaction",
                format!(
                    "failed to delete {} of {} copied files: {}",
                    failures.len(),
                    copied_files.len(),
                    failures.join("; ")
                ),
            ))
        }
    }

    /// Reverses a move by moving each file back to its original path. A
    /// destination that no longer exists means there is nothing to restore
    /// for that file; the file may have been legitimately changed since.
    async fn rollback_move(&self, transaction: &Transaction) -> Result<()> {
        let Some(RollbackInfo::Move { moved_files }) = &transaction.rollback_info else {
            return Err(DomainError::validation_error(
                "Transaction",
                format!("transaction {} has no move rollback info", transaction.id),
            ));
        };

        let mut failures = Vec::new();
        for file in moved_files {
            match fs::try_exists(&file.destination).await {
                Ok(false) => {
                    warn!(
                        "move destination missing, nothing to restore: {}",
                        file.destination.display()
                    );
                }
                Ok(true) => {
                    if let Err(e) = self
                        .restore_moved_file(&file.destination, &file.original_path)
                        .await
                    {
                        error!(
                            "failed to restore {} to {}: {}",
                            file.destination.display(),
                            file.original_path.display(),
                            e
                        );
                        failures.push(format!("{}: {}", file.destination.display(), e));
                    }
                }
                Err(e) => {
                    failures.push(format!("{}: {}", file.destination.display(), e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DomainError::partial_failure(
                "Transaction",
                format!(
                    "failed to restore {} of {} moved files: {}",
                    failures.len(),
                    moved_files.len(),
                    failures.join("; ")
                ),
            ))
        }
    }

    async fn restore_moved_file(&self, destination: &Path, original: &Path) -> Result<()> {
        if let Some(parent) = original.parent() {
            fs::create_dir_all(parent).await?;
        }
        move_path(destination, original).await?;
        debug!(
            "restored {} to {}",
            destination.display(),
            original.display()
        );
        Ok(())
    }

    /// Reverses a delete by restoring every trash entry belonging to the
    /// transaction. Sidecars are consumed as content is restored; the
    /// trash subdirectory is removed once it ends up empty.
    async fn rollback_delete(&self, transaction: &Transaction) -> Result<()> {
        let entries = self.trash.entries_for_transaction(transaction.id).await?;

        let total = entries.len();
        let mut failures = Vec::new();
        for entry in &entries {
            match self.trash.restore_entry(entry).await {
                Ok(restored) => {
                    debug!(
                        "restored {} to {}",
                        entry.trash_path.display(),
                        restored.display()
                    );
                }
                Err(e) => {
                    error!("failed to restore {}: {}", entry.trash_path.display(), e);
                    failures.push(format!("{}: {}", entry.trash_path.display(), e));
                }
            }
        }

        if !failures.is_empty() {
            return Err(DomainError::partial_failure(
                "Transaction",
                format!(
                    "failed to restore {} of {} trashed files: {}",
                    failures.len(),
                    total,
                    failures.join("; ")
                ),
            ));
        }

        self.trash
            .remove_transaction_dir_if_empty(transaction.id)
            .await?;
        Ok(())
    }

    /// Reverses a mkdir by removing the created directory, but only when it
    /// is empty: content that accumulated inside it is user data.
    async fn rollback_mkdir(&self, transaction: &Transaction) -> Result<()> {
        let path = match &transaction.metadata {
            Some(metadata) => match &metadata.payload {
                OperationPayload::Mkdir { path } => path.clone(),
                _ => {
                    return Err(DomainError::validation_error(
                        "Transaction",
                        format!("transaction {} metadata is not a mkdir payload", transaction.id),
                    ))
                }
            },
            None => {
                return Err(DomainError::validation_error(
                    "Transaction",
                    format!("transaction {} has no mkdir metadata", transaction.id),
                ))
            }
        };

        if !fs::try_exists(&path).await? {
            debug!("directory already gone: {}", path.display());
            return Ok(());
        }

        let mut entries = fs::read_dir(&path).await?;
        if entries.next_entry().await?.is_some() {
            return Err(DomainError::conflict(
                "Directory",
                format!("cannot remove {}: directory not empty", path.display()),
            ));
        }

        fs::remove_dir(&path).await?;
        debug!("removed directory: {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl RollbackUseCase for RollbackService {
    #[instrument(skip(self))]
    async fn rollback_transaction(&self, transaction_id: i64) -> Result<String> {
        let transaction = self.ledger.get_transaction(transaction_id).await?;

        if transaction.status == TransactionStatus::RolledBack {
            return Err(DomainError::conflict(
                "Transaction",
                format!("transaction {} already rolled back", transaction_id),
            ));
        }
        if !matches!(
            transaction.status,
            TransactionStatus::Completed | TransactionStatus::Failed
        ) {
            // A pending transaction's real outcome is unknown; refuse until
            // the caller resolves it to completed or failed.
            return Err(DomainError::conflict(
                "Transaction",
                format!(
                    "cannot roll back transaction {} with status {}",
                    transaction_id, transaction.status
                ),
            ));
        }

        info!(
            operation = %transaction.operation,
            "rolling back transaction {}",
            transaction_id
        );

        match transaction.operation {
            FsOperation::Copy => self.rollback_copy(&transaction).await?,
            FsOperation::Move => self.rollback_move(&transaction).await?,
            FsOperation::Delete => self.rollback_delete(&transaction).await?,
            FsOperation::Mkdir => self.rollback_mkdir(&transaction).await?,
        }

        // Physical reversal succeeded; only now does the ledger flip
        self.ledger
            .update_transaction(
                transaction_id,
                TransactionUpdate::status(TransactionStatus::RolledBack),
            )
            .await?;

        Ok(format!(
            "Successfully rolled back {} operation",
            transaction.operation
        ))
    }
}
