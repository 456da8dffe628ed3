use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;

use crate::error::ExportError;

/// Where an export landed and what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub size_bytes: usize,
    pub content_hash: String,
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

/// Write `bytes` to `dir/file_name` through a temporary sibling that is
/// renamed into place, so a failed export never leaves a partial file.
pub async fn write_atomic(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<WrittenFile, ExportError> {
    let path = dir.join(file_name);
    let tmp = dir.join(format!(".{}.part", file_name));
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ExportError::Write { path, source }
    };

    fs::create_dir_all(dir).await.map_err(io_err(dir))?;
    if let Err(err) = fs::write(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(&tmp)(err));
    }
    if let Err(err) = fs::rename(&tmp, &path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(&path)(err));
    }

    Ok(WrittenFile {
        path,
        size_bytes: bytes.len(),
        content_hash: content_hash(bytes),
    })
}
