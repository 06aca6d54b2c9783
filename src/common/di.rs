use std::sync::Arc;

use crate::application::ports::rollback_ports::RollbackUseCase;
use crate::application::services::confirmation_service::ConfirmationService;
use crate::application::services::rollback_service::RollbackService;
use crate::common::config::CoreConfig;
use crate::common::db::create_ledger_pool;
use crate::common::errors::Result;
use crate::domain::repositories::transaction_repository::TransactionRepository;
use crate::domain::repositories::trash_repository::TrashRepository;
use crate::infrastructure::repositories::transaction_sqlite_repository::TransactionSqliteRepository;
use crate::infrastructure::repositories::trash_fs_repository::TrashFsRepository;
use crate::infrastructure::services::checksum_service::ChecksumService;

/// Composition root wiring the ledger, trash store and services together
/// from one explicit configuration.
pub struct CoreServices {
    pub confirmation: Arc<ConfirmationService>,
    pub ledger: Arc<dyn TransactionRepository>,
    pub trash: Arc<dyn TrashRepository>,
    pub checksum: Arc<ChecksumService>,
    pub rollback: Arc<dyn RollbackUseCase>,
}

impl CoreServices {
    pub async fn build(config: CoreConfig) -> Result<Self> {
        let pool = create_ledger_pool(&config.ledger_path).await?;
        let ledger: Arc<dyn TransactionRepository> =
            Arc::new(TransactionSqliteRepository::new(pool));
        let trash: Arc<dyn TrashRepository> = Arc::new(TrashFsRepository::new(
            config.trash_root.clone(),
            config.retention_days,
        ));

        let rollback: Arc<dyn RollbackUseCase> =
            Arc::new(RollbackService::new(ledger.clone(), trash.clone()));

        Ok(Self {
            confirmation: Arc::new(ConfirmationService::new(config.confirmation.clone())),
            ledger,
            trash,
            checksum: Arc::new(ChecksumService::new()),
            rollback,
        })
    }
}
