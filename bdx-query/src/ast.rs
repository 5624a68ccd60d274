//! Parsed query tree, before lowering to a [`crate::plan::Plan`].

use bdx_schema::Field;

/// The value half of a leaf (`value` in the grammar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A verbatim, single-term match (quotes stripped).
    Quoted(String),
    /// An inclusive numeric range; `None` on either side means unbounded.
    Range(Option<u64>, Option<u64>),
    /// A bare word, optionally ending in a single trailing `*` wildcard
    /// (the wildcard flag is stripped out of `text`).
    Bare { text: String, wildcard: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Not(Box<QueryNode>),
    /// `field:value`.
    FieldExpr { field: Field, value: Value },
    /// A bare/quoted term with no field prefix; matched against tokenized
    /// `name` per the grammar.
    Term(Value),
}
