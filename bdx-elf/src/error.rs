//! Per-file ELF errors. A failure here is always scoped to one object file:
//! the indexer logs it and moves on, it never aborts a run.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ElfError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: not a readable object file: {message}")]
    Malformed { path: PathBuf, message: String },
}

impl ElfError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ElfError::Io { path: path.to_path_buf(), source }
    }

    pub fn malformed(path: &std::path::Path, message: impl Into<String>) -> Self {
        ElfError::Malformed { path: path.to_path_buf(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, ElfError>;
