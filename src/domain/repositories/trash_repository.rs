use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::common::errors::Result;
use crate::domain::entities::trash_entry::{CleanupReport, TrashEntry};

/// Physical holding area for soft-deleted content, keyed by transaction id.
#[async_trait]
pub trait TrashRepository: Send + Sync {
    /// Moves a file into the per-transaction trash subdirectory, resolving
    /// name collisions by suffixing, and writes the metadata sidecar. The
    /// entry only becomes visible once the sidecar exists.
    async fn move_to_trash(
        &self,
        file_path: &Path,
        transaction_id: i64,
        original_path: Option<&Path>,
    ) -> Result<PathBuf>;

    /// Enumerates all trash entries across transactions, newest-first
    async fn list_trash(&self) -> Result<Vec<TrashEntry>>;

    /// Entries owned by one transaction; NotFound when its subdirectory
    /// does not exist
    async fn entries_for_transaction(&self, transaction_id: i64) -> Result<Vec<TrashEntry>>;

    /// Restores one entry to its original path (suffixing `_restored_N` on
    /// collision), deletes its sidecar, and returns the restored path
    async fn restore_entry(&self, entry: &TrashEntry) -> Result<PathBuf>;

    /// Removes the transaction subdirectory only if it is empty
    async fn remove_transaction_dir_if_empty(&self, transaction_id: i64) -> Result<()>;

    /// Deletes content and sidecar for every entry older than the retention
    /// window, then prunes empty subdirectories
    async fn cleanup_old_trash(&self) -> Result<CleanupReport>;

    /// Total content bytes currently held in trash
    async fn trash_usage_bytes(&self) -> Result<u64>;
}
