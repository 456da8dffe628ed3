use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort an export. Nothing is written when one occurs.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not read bitmap {}: {source}", .path.display())]
    ReadBitmap {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("bitmap has no pixels")]
    EmptyBitmap,
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("PDF assembly failed: {0}")]
    Pdf(String),
    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
