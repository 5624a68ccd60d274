//! Reference-graph engine: given a source query and a sink query, enumerates
//! up to `N` paths between their matches, where an edge from symbol `u` to
//! symbol `v` exists whenever `v`'s name appears in `u`'s relocation list.
//! Edges are resolved against the searcher at traversal time rather than
//! pre-built into a static graph, since relocation targets are raw names
//! that may resolve to zero, one, or several defined symbols.

pub mod engine;
pub mod error;

pub use engine::{find_paths, Algorithm, GraphOptions, SymbolPath};
pub use error::{GraphError, Result};
