use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a whole CSV load. Per-field problems never surface
/// here; they degrade to defaults inside the mapper.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file is not valid {0}")]
    Encoding(&'static str),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV has no header row")]
    MissingHeaders,
}
