use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::common::errors::Result;

/// Block size for streaming file content through the hasher
const CHECKSUM_BLOCK_SIZE: usize = 8192;

/// Computes content digests used to fingerprint files before they move
/// through the trash.
pub struct ChecksumService;

impl ChecksumService {
    pub fn new() -> Self {
        Self
    }

    /// SHA-256 hex digest of a file, streamed in fixed-size blocks so large
    /// files never load fully into memory.
    pub async fn calculate_checksum(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; CHECKSUM_BLOCK_SIZE];

        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }
}

impl Default for ChecksumService {
    fn default() -> Self {
        Self::new()
    }
}
