//! Top-level CLI error: wraps every crate's error type and maps it onto the
//! exit codes in spec §6/§7 (`0` success, `1` query-parse, `2` usage, `3`
//! I/O or index error; `4` is reserved and never returned by this binary).

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("usage error: {0}")]
    Usage(String),

    /// A query failed to parse. Carries the message already rendered with a
    /// caret under the failing column, since by the time this is
    /// constructed the original query text is still in scope but the
    /// wrapped `ParseError` only remembers a column offset.
    #[error("{0}")]
    QueryParse(String),

    #[error(transparent)]
    Index(#[from] bdx_index::IndexError),

    #[error(transparent)]
    Store(#[from] bdx_store::StoreError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::QueryParse(_) => 1,
            Error::Usage(_) => 2,
            Error::Index(_) | Error::Store(_) | Error::Io(_) => 3,
        }
    }

    /// One-line, stable-prefixed message; no backtraces by default.
    pub fn render(&self) -> String {
        match self {
            Error::QueryParse(msg) => msg.clone(),
            other => format!("bdx: {other}"),
        }
    }

    pub fn from_search(query: &str, err: bdx_search::SearchError) -> Error {
        match err {
            bdx_search::SearchError::Parse(e) => {
                Error::QueryParse(format!("bdx: query parse error: {}", e.caret(query)))
            }
            bdx_search::SearchError::Store(e) => Error::Store(e),
        }
    }

    pub fn from_graph(source_query: &str, sink_query: &str, err: bdx_graph::GraphError) -> Error {
        match err {
            bdx_graph::GraphError::Source(e) => Error::from_search(source_query, e),
            bdx_graph::GraphError::Sink(e) => Error::from_search(sink_query, e),
            bdx_graph::GraphError::Edge(e) => Error::from_search("", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
