pub mod transaction_sqlite_repository;
pub mod trash_fs_repository;
