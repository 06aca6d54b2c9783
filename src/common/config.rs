use std::collections::HashSet;
use std::path::PathBuf;

use crate::domain::entities::transaction::FsOperation;

/// Confirmation gate policy
#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    /// Whether confirmation is enabled at all
    pub enabled: bool,
    /// Operations that require confirmation
    pub require_for: HashSet<FsOperation>,
    /// Operations below this total size are approved without prompting
    pub auto_approve_under_bytes: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_for: [FsOperation::Copy, FsOperation::Move, FsOperation::Delete]
                .into_iter()
                .collect(),
            auto_approve_under_bytes: 10 * 1024 * 1024, // 10 MB
        }
    }
}

/// Explicit configuration for the ledger, trash store and confirmation gate.
/// Nothing here is resolved implicitly inside components; callers decide the
/// paths and pass this struct into the constructors.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Path to the SQLite ledger file
    pub ledger_path: PathBuf,
    /// Root directory holding per-transaction trash subdirectories
    pub trash_root: PathBuf,
    /// Days a trashed file is retained before cleanup may delete it
    pub retention_days: u32,
    /// Advisory ceiling on total trash content size
    pub max_trash_size_bytes: u64,
    /// Confirmation gate policy
    pub confirmation: ConfirmationConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            ledger_path: data_dir.join("transactions.db"),
            trash_root: data_dir.join("trash"),
            retention_days: 30,
            max_trash_size_bytes: 50 * 1024 * 1024 * 1024, // 50 GB
            confirmation: ConfirmationConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Builds the configuration from environment variables, falling back to
    /// the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("FSLEDGER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let mut confirmation = ConfirmationConfig::default();
        if let Ok(value) = std::env::var("FSLEDGER_CONFIRM") {
            confirmation.enabled = !matches!(value.as_str(), "0" | "false" | "no");
        }
        confirmation.auto_approve_under_bytes =
            env_u64("FSLEDGER_AUTO_APPROVE_MB", 10) * 1024 * 1024;

        Self {
            ledger_path: data_dir.join("transactions.db"),
            trash_root: data_dir.join("trash"),
            retention_days: env_u64("FSLEDGER_RETENTION_DAYS", 30) as u32,
            max_trash_size_bytes: env_u64("FSLEDGER_MAX_TRASH_GB", 50) * 1024 * 1024 * 1024,
            confirmation,
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".fsledger")
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
