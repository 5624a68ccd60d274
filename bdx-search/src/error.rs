#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Parse(#[from] bdx_query::ParseError),

    #[error(transparent)]
    Store(#[from] bdx_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SearchError>;
