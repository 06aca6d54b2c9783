use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::errors::DomainError;

/// The four destructive filesystem operations the ledger knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsOperation {
    Copy,
    Move,
    Delete,
    Mkdir,
}

impl fmt::Display for FsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsOperation::Copy => write!(f, "copy"),
            FsOperation::Move => write!(f, "move"),
            FsOperation::Delete => write!(f, "delete"),
            FsOperation::Mkdir => write!(f, "mkdir"),
        }
    }
}

impl FromStr for FsOperation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copy" => Ok(FsOperation::Copy),
            "move" => Ok(FsOperation::Move),
            "delete" => Ok(FsOperation::Delete),
            "mkdir" => Ok(FsOperation::Mkdir),
            other => Err(DomainError::validation_error(
                "Transaction",
                format!("unknown operation: {}", other),
            )),
        }
    }
}

/// Lifecycle of a transaction. Transitions are forward-only:
/// Pending -> {Completed, Failed} -> RolledBack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    RolledBack,
}

impl TransactionStatus {
    /// Whether a status update from `self` to `next` is legal. Identity
    /// transitions are allowed so repeated updates stay idempotent.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        match (self, next) {
            (current, target) if current == target => true,
            (Pending, Completed) | (Pending, Failed) => true,
            (Completed, RolledBack) | (Failed, RolledBack) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Failed => write!(f, "failed"),
            TransactionStatus::RolledBack => write!(f, "rolled_back"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "rolled_back" => Ok(TransactionStatus::RolledBack),
            other => Err(DomainError::validation_error(
                "Transaction",
                format!("unknown status: {}", other),
            )),
        }
    }
}

/// One file produced by a copy operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopiedFile {
    pub destination: PathBuf,
}

/// Original/destination pair recorded before a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovedFile {
    pub original_path: PathBuf,
    pub destination: PathBuf,
}

/// Content fingerprint captured before a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChecksum {
    pub path: PathBuf,
    pub sha256: String,
}

/// Operation-specific metadata, one variant per operation kind. Serialized
/// to JSON only at the storage boundary; inside the crate the undo
/// coordinator dispatches on the variant instead of probing loose keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationPayload {
    Copy {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PathBuf>,
        copied_files: Vec<CopiedFile>,
        #[serde(default)]
        total_size_bytes: u64,
    },
    Move {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PathBuf>,
        #[serde(default)]
        file_count: u64,
    },
    Delete {
        paths: Vec<PathBuf>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        checksums: Vec<FileChecksum>,
    },
    Mkdir {
        path: PathBuf,
    },
}

/// Transaction metadata: the typed payload plus the failure message a
/// `failed` update preserves for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    #[serde(flatten)]
    pub payload: OperationPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionMetadata {
    pub fn new(payload: OperationPayload) -> Self {
        Self {
            payload,
            error: None,
        }
    }

    pub fn with_error<S: Into<String>>(mut self, error: S) -> Self {
        self.error = Some(error.into());
        self
    }
}

impl From<OperationPayload> for TransactionMetadata {
    fn from(payload: OperationPayload) -> Self {
        Self::new(payload)
    }
}

/// Data sufficient to reverse an operation without re-deriving it from the
/// metadata column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum RollbackInfo {
    Copy { copied_files: Vec<CopiedFile> },
    Move { moved_files: Vec<MovedFile> },
    Delete { file_count: u64 },
    Mkdir { path: PathBuf },
}

/// Durable record of one attempted filesystem mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: FsOperation,
    pub status: TransactionStatus,
    pub user_approved: bool,
    pub metadata: Option<TransactionMetadata>,
    pub rollback_info: Option<RollbackInfo>,
}
