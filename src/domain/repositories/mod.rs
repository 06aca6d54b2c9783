pub mod transaction_repository;
pub mod trash_repository;
