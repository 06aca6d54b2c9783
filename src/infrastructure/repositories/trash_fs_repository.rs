use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::fs;
use tracing::{debug, error, instrument, warn};

use crate::common::errors::{DomainError, Result};
use crate::common::fsutil::move_path;
use crate::domain::entities::trash_entry::{CleanupReport, TrashEntry, TrashSidecar};
use crate::domain::repositories::trash_repository::TrashRepository;

/// Filesystem-backed trash store. Layout: one subdirectory per transaction
/// id under the trash root, each holding content files plus one
/// `.{filename}.metadata.json` sidecar per file.
pub struct TrashFsRepository {
    trash_root: PathBuf,
    retention_days: u32,
}

impl TrashFsRepository {
    pub fn new(trash_root: PathBuf, retention_days: u32) -> Self {
        Self {
            trash_root,
            retention_days,
        }
    }

    fn transaction_dir(&self, transaction_id: i64) -> PathBuf {
        self.trash_root.join(transaction_id.to_string())
    }

    /// Splits a file name into stem and extension for suffix generation
    fn split_name(file_name: &str) -> (String, String) {
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (stem, ext)
    }

    /// Reads the sidecar for a content file. None when the sidecar is
    /// missing: such a file is not yet (or no longer) a trash entry.
    async fn read_entry(&self, transaction_id: i64, content_path: &Path) -> Result<Option<TrashEntry>> {
        let Some(name) = content_path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(None);
        };
        let sidecar_path = content_path
            .parent()
            .map(|p| p.join(TrashSidecar::sidecar_file_name(&name)))
            .unwrap_or_default();

        let raw = match fs::read(&sidecar_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let sidecar: TrashSidecar = serde_json::from_slice(&raw)?;

        Ok(Some(TrashEntry {
            transaction_id,
            trash_path: content_path.to_path_buf(),
            original_path: sidecar.original_path,
            timestamp: sidecar.timestamp,
            size_bytes: sidecar.size_bytes,
        }))
    }

    /// Collects entries from one transaction subdirectory
    async fn collect_entries(&self, transaction_id: i64, dir: &Path) -> Result<Vec<TrashEntry>> {
        let mut entries = Vec::new();
        let mut reader = fs::read_dir(dir).await?;
        while let Some(item) = reader.next_entry().await? {
            let name = item.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue; // sidecars
            }
            if let Some(entry) = self.read_entry(transaction_id, &item.path()).await? {
                entries.push(entry);
            } else {
                debug!("skipping sidecar-less file in trash: {}", name);
            }
        }
        Ok(entries)
    }

    async fn remove_entry_files(&self, entry: &TrashEntry) -> Result<u64> {
        let size = match fs::metadata(&entry.trash_path).await {
            Ok(meta) => meta.len(),
            Err(_) => entry.size_bytes,
        };
        fs::remove_file(&entry.trash_path).await?;
        let name = entry
            .trash_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(parent) = entry.trash_path.parent() {
            let sidecar = parent.join(TrashSidecar::sidecar_file_name(&name));
            if let Err(e) = fs::remove_file(&sidecar).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(e.into());
                }
            }
        }
        Ok(size)
    }
}

#[async_trait]
impl TrashRepository for TrashFsRepository {
    #[instrument(skip(self))]
    async fn move_to_trash(
        &self,
        file_path: &Path,
        transaction_id: i64,
        original_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let original = original_path.unwrap_or(file_path);

        let tx_dir = self.transaction_dir(transaction_id);
        fs::create_dir_all(&tx_dir).await?;

        let file_name = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DomainError::validation_error(
                    "Trash",
                    format!("path has no file name: {}", original.display()),
                )
            })?;

        // Resolve name collisions inside the transaction directory by
        // suffixing the stem with an incrementing counter
        let (stem, ext) = Self::split_name(&file_name);
        let mut trash_path = tx_dir.join(&file_name);
        let mut counter = 1;
        while fs::try_exists(&trash_path).await? {
            trash_path = tx_dir.join(format!("{}_{}{}", stem, counter, ext));
            counter += 1;
        }

        move_path(file_path, &trash_path).await?;

        // The sidecar makes the entry visible; write it last
        let size_bytes = fs::metadata(&trash_path).await?.len();
        let sidecar = TrashSidecar {
            original_path: original.to_path_buf(),
            timestamp: Utc::now(),
            transaction_id,
            size_bytes,
        };
        let trashed_name = trash_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(file_name);
        let sidecar_path = tx_dir.join(TrashSidecar::sidecar_file_name(&trashed_name));
        fs::write(&sidecar_path, serde_json::to_vec_pretty(&sidecar)?).await?;

        debug!(
            "trashed {} as {}",
            original.display(),
            trash_path.display()
        );
        Ok(trash_path)
    }

    async fn list_trash(&self) -> Result<Vec<TrashEntry>> {
        if !fs::try_exists(&self.trash_root).await? {
            return Ok(Vec::new());
        }

        let mut all = Vec::new();
        let mut dirs = fs::read_dir(&self.trash_root).await?;
        while let Some(dir) = dirs.next_entry().await? {
            if !dir.file_type().await?.is_dir() {
                continue;
            }
            let Ok(transaction_id) = dir.file_name().to_string_lossy().parse::<i64>() else {
                warn!(
                    "ignoring non-transaction directory in trash: {}",
                    dir.path().display()
                );
                continue;
            };
            all.extend(self.collect_entries(transaction_id, &dir.path()).await?);
        }

        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(all)
    }

    async fn entries_for_transaction(&self, transaction_id: i64) -> Result<Vec<TrashEntry>> {
        let tx_dir = self.transaction_dir(transaction_id);
        if !fs::try_exists(&tx_dir).await? {
            return Err(DomainError::not_found(
                "Trash",
                format!("transaction {}", transaction_id),
            ));
        }
        self.collect_entries(transaction_id, &tx_dir).await
    }

    #[instrument(skip(self, entry))]
    async fn restore_entry(&self, entry: &TrashEntry) -> Result<PathBuf> {
        if let Some(parent) = entry.original_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // A collision at the destination gets a `_restored_N` suffix; the
        // trashed copy never overwrites whatever took the original's place
        let file_name = entry
            .original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, ext) = Self::split_name(&file_name);
        let parent = entry
            .original_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut restore_path = entry.original_path.clone();
        let mut counter = 1;
        while fs::try_exists(&restore_path).await? {
            restore_path = parent.join(format!("{}_restored_{}{}", stem, counter, ext));
            counter += 1;
        }

        move_path(&entry.trash_path, &restore_path).await?;

        let trashed_name = entry
            .trash_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(trash_parent) = entry.trash_path.parent() {
            let sidecar = trash_parent.join(TrashSidecar::sidecar_file_name(&trashed_name));
            if let Err(e) = fs::remove_file(&sidecar).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("failed to remove sidecar {}: {}", sidecar.display(), e);
                }
            }
        }

        debug!(
            "restored {} to {}",
            entry.trash_path.display(),
            restore_path.display()
        );
        Ok(restore_path)
    }

    async fn remove_transaction_dir_if_empty(&self, transaction_id: i64) -> Result<()> {
        let tx_dir = self.transaction_dir(transaction_id);
        match fs::remove_dir(&tx_dir).await {
            Ok(()) => {
                debug!("removed empty trash directory {}", tx_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                // Still holding content (e.g. sidecar-less leftovers); leave it
                debug!("leaving trash directory {} in place: {}", tx_dir.display(), e);
                Ok(())
            }
        }
    }

    #[instrument(skip(self))]
    async fn cleanup_old_trash(&self) -> Result<CleanupReport> {
        let cutoff = Utc::now() - Duration::days(self.retention_days as i64);
        let mut report = CleanupReport::default();

        if !fs::try_exists(&self.trash_root).await? {
            return Ok(report);
        }

        let mut dirs = fs::read_dir(&self.trash_root).await?;
        while let Some(dir) = dirs.next_entry().await? {
            if !dir.file_type().await?.is_dir() {
                continue;
            }
            let Ok(transaction_id) = dir.file_name().to_string_lossy().parse::<i64>() else {
                continue;
            };

            for entry in self.collect_entries(transaction_id, &dir.path()).await? {
                // Only entries strictly older than the retention window are
                // touched; an in-flight operation's fresh sidecar never is
                if entry.timestamp >= cutoff {
                    continue;
                }
                match self.remove_entry_files(&entry).await {
                    Ok(size) => {
                        report.files_deleted += 1;
                        report.bytes_freed += size;
                    }
                    Err(e) => {
                        error!(
                            "failed to clean up {}: {}",
                            entry.trash_path.display(),
                            e
                        );
                    }
                }
            }

            // Prune the directory when cleanup emptied it
            let _ = fs::remove_dir(dir.path()).await;
        }

        debug!(
            "trash cleanup removed {} files, freed {} bytes",
            report.files_deleted, report.bytes_freed
        );
        Ok(report)
    }

    async fn trash_usage_bytes(&self) -> Result<u64> {
        let mut total = 0;
        for entry in self.list_trash().await? {
            total += match fs::metadata(&entry.trash_path).await {
                Ok(meta) => meta.len(),
                Err(_) => entry.size_bytes,
            };
        }
        Ok(total)
    }
}
