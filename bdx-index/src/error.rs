use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: malformed compilation database: {message}")]
    BadCompileDb { path: PathBuf, message: String },

    #[error(transparent)]
    Store(#[from] bdx_store::StoreError),

    #[error("failed to build a {0}-thread parser pool: {1}")]
    PoolBuild(usize, rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, IndexError>;
