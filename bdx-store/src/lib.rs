//! On-disk symbol store: sharded records with a single atomically-committed
//! manifest. One exclusive writer at a time (lock file); readers never
//! lock and only ever see a fully committed manifest.

pub mod error;
pub mod manifest;
pub mod shard;
pub mod store;

pub use error::{Result, StoreError};
pub use manifest::{FileEntry, Manifest, SCHEMA_VERSION};
pub use shard::{LocalId, RangeSlot, Shard, ShardWriter, TokSlot, WholeSlot};
pub use store::{CancelToken, Store, WriteTxn};
