use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::entities::transaction::FsOperation;

/// Maximum number of files shown in a rendered preview
const PREVIEW_SAMPLE_LIMIT: usize = 10;

/// One file affected by a proposed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePreview {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Immutable dry-run summary of a proposed mutation. Built by the
/// confirmation gate, shown to a human or returned to an API caller
/// before anything touches the filesystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationPreview {
    pub operation: FsOperation,
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub file_count: usize,
    pub total_size_bytes: u64,
    pub files: Vec<FilePreview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl OperationPreview {
    /// Renders the preview as human-readable text: operation, source with
    /// count and total size, destination, and up to ten sample files.
    pub fn format_preview(&self) -> String {
        let mut lines = vec![format!(
            "Operation: {}",
            self.operation.to_string().to_uppercase()
        )];

        if let Some(source) = &self.source {
            lines.push(format!(
                "Source: {} ({} files, {})",
                source.display(),
                self.file_count,
                format_size(self.total_size_bytes)
            ));
        }

        if let Some(destination) = &self.destination {
            lines.push(format!("Destination: {}", destination.display()));
        }

        if self.file_count > 0 {
            lines.push("Files affected:".to_string());
            for file in self.files.iter().take(PREVIEW_SAMPLE_LIMIT) {
                lines.push(format!(
                    "  - {} ({})",
                    file.name,
                    format_size(file.size_bytes)
                ));
            }
            if self.file_count > PREVIEW_SAMPLE_LIMIT {
                lines.push(format!(
                    "  ... ({} more files)",
                    self.file_count - PREVIEW_SAMPLE_LIMIT
                ));
            }
        }

        lines.join("\n")
    }
}

/// Formats a byte count as a human-readable size with one decimal
pub fn format_size(size_bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if size_bytes < KB {
        format!("{} B", size_bytes)
    } else if size_bytes < MB {
        format!("{:.1} KB", size_bytes as f64 / KB as f64)
    } else if size_bytes < GB {
        format!("{:.1} MB", size_bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", size_bytes as f64 / GB as f64)
    }
}
