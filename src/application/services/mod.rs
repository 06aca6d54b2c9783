pub mod confirmation_service;
pub mod rollback_service;

#[cfg(test)]
mod rollback_service_test;

pub use confirmation_service::ConfirmationService;
pub use rollback_service::RollbackService;
