use thiserror::Error;

/// Query-syntax error, surfaced to the user with a caret at the failing
/// position (see `ParseError::caret`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("query parse error at column {column}: {message}")]
pub struct ParseError {
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(column: usize, message: impl Into<String>) -> Self {
        ParseError {
            column,
            message: message.into(),
        }
    }

    /// Render the original query with a caret under the failing column, for
    /// terminal-friendly diagnostics.
    pub fn caret(&self, source: &str) -> String {
        let pointer = " ".repeat(self.column) + "^";
        format!("{source}\n{pointer}\n{self}")
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
