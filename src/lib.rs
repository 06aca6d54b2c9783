// Core modules of the safety layer
pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;

// Common public re-exports
pub use application::ports::rollback_ports::RollbackUseCase;
pub use application::services::confirmation_service::{ConfirmationMode, ConfirmationService};
pub use application::services::rollback_service::RollbackService;
pub use common::config::{ConfirmationConfig, CoreConfig};
pub use common::di::CoreServices;
pub use common::errors::{DomainError, ErrorKind, Result};
pub use domain::entities::operation_preview::{format_size, FilePreview, OperationPreview};
pub use domain::entities::transaction::{
    FsOperation, OperationPayload, RollbackInfo, Transaction, TransactionMetadata,
    TransactionStatus,
};
pub use domain::entities::trash_entry::{CleanupReport, TrashEntry};
pub use domain::repositories::transaction_repository::{
    TransactionFilter, TransactionRepository, TransactionUpdate,
};
pub use domain::repositories::trash_repository::TrashRepository;
pub use infrastructure::repositories::transaction_sqlite_repository::TransactionSqliteRepository;
pub use infrastructure::repositories::trash_fs_repository::TrashFsRepository;
pub use infrastructure::services::checksum_service::ChecksumService;
