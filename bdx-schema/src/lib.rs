//! Symbol record model and field-kind schema shared by the indexer, query
//! planner, searcher, and graph engine.

pub mod field;
pub mod record;
pub mod tokenize;

pub use field::{Field, FieldKind};
pub use record::{SymbolRecord, SymbolType};
