//! One indexing run: discover candidate object files, diff them against the
//! store's manifest, parse what changed in parallel, and commit one shard.

pub mod discover;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod workset;

pub use error::{IndexError, Result};
pub use options::IndexerOptions;
pub use pipeline::{run, FileFailure, RunReport};
pub use workset::{compute as compute_workset, read_candidates, Candidate, WorkSet};
