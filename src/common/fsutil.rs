use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::common::errors::Result;

/// Moves a path, falling back to copy+remove when rename fails (e.g. the
/// source and destination sit on different filesystems).
pub(crate) async fn move_path(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                "rename {} -> {} failed ({}), falling back to copy",
                from.display(),
                to.display(),
                rename_err
            );
            fs::copy(from, to).await?;
            fs::remove_file(from).await?;
            Ok(())
        }
    }
}
