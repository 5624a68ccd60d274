//! Executes a parsed query plan against a store's shards, merging results
//! by `(path, address)` with newer-shard-wins tie-breaking.

pub mod bridge;
pub mod error;
pub mod exec;
pub mod searcher;

pub use error::{Result, SearchError};
pub use searcher::Searcher;
