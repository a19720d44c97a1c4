use std::path::PathBuf;

use thiserror::Error;

/// Why a single tileset or map export failed. Failures never spread to other
/// exports of the same batch.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The library or map could not be read or is corrupt.
    #[error("failed to read source '{target}'")]
    SourceRead {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    /// An output file or directory could not be written.
    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl ExportError {
    pub fn source_read(target: impl Into<String>, source: anyhow::Error) -> Self {
        ExportError::SourceRead {
            target: target.into(),
            source,
        }
    }

    /// Short machine-readable kind, used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::SourceRead { .. } => "source_read",
            ExportError::Write { .. } => "write",
        }
    }
}
