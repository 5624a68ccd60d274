use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed shard/manifest JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store is locked by another writer (lock file at {0})")]
    LockContention(std::path::PathBuf),

    #[error("schema version mismatch: store is v{found}, this binary supports v{expected}")]
    SchemaVersionMismatch { found: u32, expected: u32 },

    #[error("index error: {0}")]
    IndexError(String),

    #[error("write was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, StoreError>;
