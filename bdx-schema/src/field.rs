//! Field schema: maps each [`crate::record::SymbolRecord`] field to an
//! indexing kind and a query-language identifier.

use std::fmt;

/// How a field's values are turned into index terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Split into sub-tokens (identifier/path boundaries) *and* indexed as
    /// one whole-value term, reachable separately via a `fullname:`/`path:`
    /// style qualifier.
    Tokenized,
    /// Indexed as a single, un-split term.
    WholeTerm,
    /// Indexed for inclusive range lookups over an unsigned 64-bit value.
    NumericRange,
}

/// The closed set of query-language field identifiers.
///
/// This is the Rust stand-in for "dynamic typing of query fields": each
/// variant carries its own parse/index rules via [`Field::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    FullName,
    Path,
    Section,
    Type,
    Address,
    Size,
    Mtime,
    Relocations,
    Source,
}

impl Field {
    pub const ALL: &'static [Field] = &[
        Field::Name,
        Field::FullName,
        Field::Path,
        Field::Section,
        Field::Type,
        Field::Address,
        Field::Size,
        Field::Mtime,
        Field::Relocations,
        Field::Source,
    ];

    /// Parse a query-language `IDENT`. Returns `None` for unknown prefixes,
    /// which the parser turns into a pointed `ParseError`.
    pub fn parse(ident: &str) -> Option<Field> {
        Some(match ident {
            "name" => Field::Name,
            "fullname" => Field::FullName,
            "path" => Field::Path,
            "section" => Field::Section,
            "type" => Field::Type,
            "address" => Field::Address,
            "size" => Field::Size,
            "mtime" => Field::Mtime,
            "relocations" => Field::Relocations,
            "source" => Field::Source,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::FullName => "fullname",
            Field::Path => "path",
            Field::Section => "section",
            Field::Type => "type",
            Field::Address => "address",
            Field::Size => "size",
            Field::Mtime => "mtime",
            Field::Relocations => "relocations",
            Field::Source => "source",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Name | Field::Path | Field::Source => FieldKind::Tokenized,
            Field::FullName | Field::Section | Field::Type | Field::Relocations => {
                FieldKind::WholeTerm
            }
            Field::Address | Field::Size | Field::Mtime => FieldKind::NumericRange,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
