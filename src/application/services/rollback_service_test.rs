use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;

use crate::application::ports::rollback_ports::RollbackUseCase;
use crate::application::services::rollback_service::RollbackService;
use crate::common::db::create_ledger_pool;
use crate::common::errors::{DomainError, ErrorKind, Result};
use crate::domain::entities::transaction::{
    CopiedFile, FsOperation, MovedFile, OperationPayload, RollbackInfo, Transaction,
    TransactionMetadata, TransactionStatus,
};
use crate::domain::entities::trash_entry::{CleanupReport, TrashEntry};
use crate::domain::repositories::transaction_repository::{
    TransactionFilter, TransactionRepository, TransactionUpdate,
};
use crate::domain::repositories::trash_repository::TrashRepository;
use crate::infrastructure::repositories::transaction_sqlite_repository::TransactionSqliteRepository;
use crate::infrastructure::repositories::trash_fs_repository::TrashFsRepository;

// Mock repositories for precondition tests

struct MockTransactionRepository {
    transactions: Mutex<HashMap<i64, Transaction>>,
}

impl MockTransactionRepository {
    fn new() -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
        }
    }

    fn seed(&self, transaction: Transaction) {
        let mut transactions = self.transactions.lock().unwrap();
        transactions.insert(transaction.id, transaction);
    }
}

#[async_trait]
impl TransactionRepository for MockTransactionRepository {
    async fn log_transaction(
        &self,
        operation: FsOperation,
        status: TransactionStatus,
        user_approved: bool,
        metadata: Option<TransactionMetadata>,
        rollback_info: Option<RollbackInfo>,
    ) -> Result<i64> {
        let mut transactions = self.transactions.lock().unwrap();
        let id = transactions.len() as i64 + 1;
        transactions.insert(
            id,
            Transaction {
                id,
                timestamp: Utc::now(),
                operation,
                status,
                user_approved,
                metadata,
                rollback_info,
            },
        );
        Ok(id)
    }

    async fn update_transaction(&self, id: i64, update: TransactionUpdate) -> Result<()> {
        let mut transactions = self.transactions.lock().unwrap();
        let transaction = transactions
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Transaction", id.to_string()))?;
        if let Some(status) = update.status {
            transaction.status = status;
        }
        if let Some(metadata) = update.metadata {
            transaction.metadata = Some(metadata);
        }
        if let Some(rollback_info) = update.rollback_info {
            transaction.rollback_info = Some(rollback_info);
        }
        Ok(())
    }

    async fn get_transaction(&self, id: i64) -> Result<Transaction> {
        let transactions = self.transactions.lock().unwrap();
        transactions
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Transaction", id.to_string()))
    }

    async fn list_transactions(&self, _filter: TransactionFilter) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.lock().unwrap();
        Ok(transactions.values().cloned().collect())
    }

    async fn get_recent_transactions(&self, _days: u32, _limit: i64) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.lock().unwrap();
        Ok(transactions.values().cloned().collect())
    }
}

struct MockTrashRepository;

#[async_trait]
impl TrashRepository for MockTrashRepository {
    async fn move_to_trash(
        &self,
        _file_path: &std::path::Path,
        _transaction_id: i64,
        _original_path: Option<&std::path::Path>,
    ) -> Result<PathBuf> {
        unimplemented!("not exercised by these tests")
    }

    async fn list_trash(&self) -> Result<Vec<TrashEntry>> {
        Ok(Vec::new())
    }

    async fn entries_for_transaction(&self, transaction_id: i64) -> Result<Vec<TrashEntry>> {
        Err(DomainError::not_found(
            "Trash",
            format!("transaction {}", transaction_id),
        ))
    }

    async fn restore_entry(&self, _entry: &TrashEntry) -> Result<PathBuf> {
        unimplemented!("not exercised by these tests")
    }

    async fn remove_transaction_dir_if_empty(&self, _transaction_id: i64) -> Result<()> {
        Ok(())
    }

    async fn cleanup_old_trash(&self) -> Result<CleanupReport> {
        Ok(CleanupReport::default())
    }

    async fn trash_usage_bytes(&self) -> Result<u64> {
        Ok(0)
    }
}

fn mock_service() -> (Arc<MockTransactionRepository>, RollbackService) {
    let ledger = Arc::new(MockTransactionRepository::new());
    let service = RollbackService::new(ledger.clone(), Arc::new(MockTrashRepository));
    (ledger, service)
}

fn seeded_transaction(id: i64, operation: FsOperation, status: TransactionStatus) -> Transaction {
    Transaction {
        id,
        timestamp: Utc::now(),
        operation,
        status,
        user_approved: true,
        metadata: None,
        rollback_info: None,
    }
}

#[tokio::test]
async fn rollback_of_unknown_transaction_is_not_found() {
    let (_, service) = mock_service();

    let err = service.rollback_transaction(999_999).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(err.message.to_lowercase().contains("not found"));
}

#[tokio::test]
async fn rollback_of_rolled_back_transaction_is_rejected() {
    let (ledger, service) = mock_service();
    ledger.seed(seeded_transaction(
        1,
        FsOperation::Mkdir,
        TransactionStatus::RolledBack,
    ));

    let err = service.rollback_transaction(1).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(err.message.contains("already rolled back"));
}

#[tokio::test]
async fn rollback_of_pending_transaction_is_refused() {
    // A pending transaction's real-world outcome is unknown
    let (ledger, service) = mock_service();
    ledger.seed(seeded_transaction(
        2,
        FsOperation::Delete,
        TransactionStatus::Pending,
    ));

    let err = service.rollback_transaction(2).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(err.message.contains("pending"));
}

// End-to-end round-trips against the real ledger and trash store

struct TestCore {
    _dir: tempfile::TempDir,
    root: PathBuf,
    ledger: Arc<dyn TransactionRepository>,
    trash: Arc<dyn TrashRepository>,
    service: RollbackService,
}

async fn real_core() -> TestCore {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let pool = create_ledger_pool(&root.join("transactions.db"))
        .await
        .unwrap();
    let ledger: Arc<dyn TransactionRepository> = Arc::new(TransactionSqliteRepository::new(pool));
    let trash: Arc<dyn TrashRepository> = Arc::new(TrashFsRepository::new(root.join("trash"), 30));
    let service = RollbackService::new(ledger.clone(), trash.clone());
    TestCore {
        _dir: dir,
        root,
        ledger,
        trash,
        service,
    }
}

#[tokio::test]
async fn copy_rollback_removes_the_destination_and_keeps_the_source() {
    let core = real_core().await;
    let source = core.root.join("source.txt");
    let dest = core.root.join("dest.txt");
    fs::write(&source, "Content").await.unwrap();
    fs::write(&dest, "Content").await.unwrap();

    let id = core
        .ledger
        .log_transaction(
            FsOperation::Copy,
            TransactionStatus::Completed,
            true,
            Some(TransactionMetadata::new(OperationPayload::Copy {
                source: Some(source.clone()),
                destination: Some(dest.clone()),
                copied_files: vec![CopiedFile {
                    destination: dest.clone(),
                }],
                total_size_bytes: 7,
            })),
            None,
        )
        .await
        .unwrap();

    let message = core.service.rollback_transaction(id).await.unwrap();
    assert!(message.contains("copy"));

    assert!(!dest.exists());
    assert_eq!(fs::read_to_string(&source).await.unwrap(), "Content");
    let tx = core.ledger.get_transaction(id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::RolledBack);
}

#[tokio::test]
async fn copy_rollback_with_an_undeletable_destination_is_a_partial_failure() {
    let core = real_core().await;
    let good = core.root.join("good.txt");
    fs::write(&good, "copy").await.unwrap();
    // remove_file refuses a directory, so this destination cannot be deleted
    let stubborn = core.root.join("stubborn");
    fs::create_dir(&stubborn).await.unwrap();
    fs::write(stubborn.join("inner.txt"), "content").await.unwrap();

    let id = core
        .ledger
        .log_transaction(
            FsOperation::Copy,
            TransactionStatus::Completed,
            true,
            Some(TransactionMetadata::new(OperationPayload::Copy {
                source: None,
                destination: None,
                copied_files: vec![
                    CopiedFile {
                        destination: good.clone(),
                    },
                    CopiedFile {
                        destination: stubborn.clone(),
                    },
                ],
                total_size_bytes: 4,
            })),
            None,
        )
        .await
        .unwrap();

    let err = core.service.rollback_transaction(id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PartialFailure);
    assert!(err.message.contains("1 of 2"));

    // The deletable destination was still reversed
    assert!(!good.exists());
    assert!(stubborn.join("inner.txt").exists());
    // The ledger never flipped: the transaction stays completed
    let tx = core.ledger.get_transaction(id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn move_rollback_restores_the_original_path() {
    let core = real_core().await;
    let original = core.root.join("nested/original.txt");
    let moved = core.root.join("moved.txt");
    fs::write(&moved, "Content").await.unwrap();

    let id = core
        .ledger
        .log_transaction(
            FsOperation::Move,
            TransactionStatus::Completed,
            true,
            None,
            Some(RollbackInfo::Move {
                moved_files: vec![MovedFile {
                    original_path: original.clone(),
                    destination: moved.clone(),
                }],
            }),
        )
        .await
        .unwrap();

    core.service.rollback_transaction(id).await.unwrap();

    // The original parent directory is recreated as needed
    assert_eq!(fs::read_to_string(&original).await.unwrap(), "Content");
    assert!(!moved.exists());
}

#[tokio::test]
async fn move_rollback_treats_a_missing_destination_as_nothing_to_restore() {
    let core = real_core().await;
    let original = core.root.join("original.txt");

    let id = core
        .ledger
        .log_transaction(
            FsOperation::Move,
            TransactionStatus::Completed,
            true,
            None,
            Some(RollbackInfo::Move {
                moved_files: vec![MovedFile {
                    original_path: original.clone(),
                    destination: core.root.join("vanished.txt"),
                }],
            }),
        )
        .await
        .unwrap();

    // The destination was deleted downstream; the rollback still succeeds
    core.service.rollback_transaction(id).await.unwrap();
    assert!(!original.exists());
    let tx = core.ledger.get_transaction(id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::RolledBack);
}

#[tokio::test]
async fn delete_rollback_restores_from_trash_and_prunes_the_subdirectory() {
    let core = real_core().await;
    let file = core.root.join("deleted.txt");
    fs::write(&file, "Original content").await.unwrap();

    let id = core
        .ledger
        .log_transaction(
            FsOperation::Delete,
            TransactionStatus::Pending,
            true,
            Some(TransactionMetadata::new(OperationPayload::Delete {
                paths: vec![file.clone()],
                checksums: Vec::new(),
            })),
            None,
        )
        .await
        .unwrap();
    core.trash.move_to_trash(&file, id, None).await.unwrap();
    core.ledger
        .update_transaction(id, TransactionUpdate::status(TransactionStatus::Completed))
        .await
        .unwrap();
    assert!(!file.exists());

    core.service.rollback_transaction(id).await.unwrap();

    assert_eq!(
        fs::read_to_string(&file).await.unwrap(),
        "Original content"
    );
    assert!(!core.root.join("trash").join(id.to_string()).exists());
    let tx = core.ledger.get_transaction(id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::RolledBack);
}

#[tokio::test]
async fn failed_delete_can_still_be_rolled_back() {
    let core = real_core().await;
    let file = core.root.join("partial.txt");
    fs::write(&file, "salvaged").await.unwrap();

    let id = core
        .ledger
        .log_transaction(
            FsOperation::Delete,
            TransactionStatus::Pending,
            true,
            None,
            None,
        )
        .await
        .unwrap();
    core.trash.move_to_trash(&file, id, None).await.unwrap();
    core.ledger
        .update_transaction(
            id,
            TransactionUpdate::status(TransactionStatus::Failed).with_metadata(
                TransactionMetadata::new(OperationPayload::Delete {
                    paths: vec![file.clone()],
                    checksums: Vec::new(),
                })
                .with_error("disk full"),
            ),
        )
        .await
        .unwrap();

    core.service.rollback_transaction(id).await.unwrap();
    assert_eq!(fs::read_to_string(&file).await.unwrap(), "salvaged");
}

#[tokio::test]
async fn mkdir_rollback_removes_an_empty_directory() {
    let core = real_core().await;
    let new_dir = core.root.join("newdir");
    fs::create_dir(&new_dir).await.unwrap();

    let id = core
        .ledger
        .log_transaction(
            FsOperation::Mkdir,
            TransactionStatus::Completed,
            true,
            Some(TransactionMetadata::new(OperationPayload::Mkdir {
                path: new_dir.clone(),
            })),
            None,
        )
        .await
        .unwrap();

    let message = core.service.rollback_transaction(id).await.unwrap();
    assert!(message.to_lowercase().contains("rolled back"));
    assert!(!new_dir.exists());

    // A second rollback of the same transaction is rejected untouched
    let err = core.service.rollback_transaction(id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(err.message.contains("already rolled back"));
}

#[tokio::test]
async fn mkdir_rollback_refuses_a_non_empty_directory() {
    let core = real_core().await;
    let new_dir = core.root.join("newdir");
    fs::create_dir(&new_dir).await.unwrap();
    fs::write(new_dir.join("file.txt"), "content").await.unwrap();

    let id = core
        .ledger
        .log_transaction(
            FsOperation::Mkdir,
            TransactionStatus::Completed,
            true,
            Some(TransactionMetadata::new(OperationPayload::Mkdir {
                path: new_dir.clone(),
            })),
            None,
        )
        .await
        .unwrap();

    let err = core.service.rollback_transaction(id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(err.message.contains("not empty"));
    assert!(new_dir.exists());

    // The ledger never flipped: the transaction stays completed
    let tx = core.ledger.get_transaction(id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn mkdir_rollback_of_an_already_gone_directory_succeeds() {
    let core = real_core().await;

    let id = core
        .ledger
        .log_transaction(
            FsOperation::Mkdir,
            TransactionStatus::Completed,
            true,
            Some(TransactionMetadata::new(OperationPayload::Mkdir {
                path: core.root.join("never-created"),
            })),
            None,
        )
        .await
        .unwrap();

    core.service.rollback_transaction(id).await.unwrap();
    let tx = core.ledger.get_transaction(id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::RolledBack);
}
