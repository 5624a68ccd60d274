#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The source query failed to parse or run.
    #[error("source query: {0}")]
    Source(bdx_search::SearchError),

    /// The sink query failed to parse or run.
    #[error("sink query: {0}")]
    Sink(bdx_search::SearchError),

    /// A relocation-name lookup made while walking edges failed; this query
    /// is synthesized internally and has no user-typed text to blame.
    #[error("relocation lookup: {0}")]
    Edge(#[from] bdx_search::SearchError),
}

pub type Result<T> = std::result::Result<T, GraphError>;
