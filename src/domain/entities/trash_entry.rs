use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One trashed file, reconstructed from its sidecar. An entry without a
/// sidecar does not exist as far as the trash store is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashEntry {
    pub transaction_id: i64,
    pub trash_path: PathBuf,
    pub original_path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Persisted form of the metadata sidecar written next to trashed content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashSidecar {
    pub original_path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub transaction_id: i64,
    pub size_bytes: u64,
}

impl TrashSidecar {
    /// Sidecar file name for a given content file name
    pub fn sidecar_file_name(content_name: &str) -> String {
        format!(".{}.metadata.json", content_name)
    }
}

/// Outcome of a retention cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub files_deleted: u64,
    pub bytes_freed: u64,
}
