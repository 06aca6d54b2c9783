use std::io::{BufRead, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::common::config::ConfirmationConfig;
use crate::domain::entities::operation_preview::{FilePreview, OperationPreview};
use crate::domain::entities::transaction::FsOperation;

/// How an approval decision is collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationMode {
    /// Interactive prompt on stdin/stdout
    Cli,
    /// Never prompts; the caller receives the preview and decides itself
    Api,
}

/// Decides whether a human must approve a mutation before it proceeds,
/// renders the preview and collects the answer.
pub struct ConfirmationService {
    config: ConfirmationConfig,
}

impl ConfirmationService {
    pub fn new(config: ConfirmationConfig) -> Self {
        Self { config }
    }

    /// Whether the operation needs explicit approval. Confirmation is
    /// skipped when disabled, when the operation is not in the configured
    /// set, or when the total size is below the auto-approval threshold.
    pub fn should_confirm(&self, operation: FsOperation, size_bytes: u64) -> bool {
        if !self.config.enabled {
            return false;
        }
        if !self.config.require_for.contains(&operation) {
            return false;
        }
        if size_bytes < self.config.auto_approve_under_bytes {
            return false;
        }
        true
    }

    /// Builds a preview from the caller-supplied file list. Pure: nothing
    /// on the filesystem is read or touched.
    pub fn generate_preview(
        &self,
        operation: FsOperation,
        source: Option<PathBuf>,
        destination: Option<PathBuf>,
        files: Vec<FilePreview>,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> OperationPreview {
        let total_size_bytes = files.iter().map(|f| f.size_bytes).sum();
        OperationPreview {
            operation,
            source,
            destination,
            file_count: files.len(),
            total_size_bytes,
            files,
            metadata,
        }
    }

    /// Requests approval for a previewed operation.
    ///
    /// Auto-approved operations return `(true, preview)` in any mode. When
    /// confirmation is required, `Api` mode returns `(false, preview)` so a
    /// non-interactive caller can re-issue with an explicit approval flag,
    /// while `Cli` mode prints the preview and blocks for a yes/no answer.
    pub fn request_confirmation(
        &self,
        preview: OperationPreview,
        mode: ConfirmationMode,
    ) -> (bool, OperationPreview) {
        if !self.should_confirm(preview.operation, preview.total_size_bytes) {
            debug!(
                operation = %preview.operation,
                size_bytes = preview.total_size_bytes,
                "operation auto-approved"
            );
            return (true, preview);
        }

        match mode {
            ConfirmationMode::Api => (false, preview),
            ConfirmationMode::Cli => {
                let approved = self.prompt_on_stdin(&preview);
                (approved, preview)
            }
        }
    }

    fn prompt_on_stdin(&self, preview: &OperationPreview) -> bool {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let separator = "=".repeat(60);
        let _ = writeln!(out, "\n{}", separator);
        let _ = writeln!(out, "{}", preview.format_preview());
        let _ = writeln!(out, "{}", separator);
        let _ = write!(out, "\nProceed? [y/N]: ");
        let _ = out.flush();

        let stdin = std::io::stdin();
        Self::read_approval(stdin.lock())
    }

    /// Reads one line and interprets it as an approval. Anything but an
    /// affirmative answer, including EOF or a read error, resolves to false.
    fn read_approval<R: BufRead>(mut reader: R) -> bool {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
        }
    }
}
