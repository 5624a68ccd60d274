//! The symbol record: the unit of indexing, one per defined symbol per object file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ELF symbol type, as resolved from the symbol table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolType {
    Func,
    Object,
    Notype,
    Section,
    File,
    Tls,
    Common,
    Ifunc,
}

impl SymbolType {
    /// The exact spelling used in records, query values, and output formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::Func => "FUNC",
            SymbolType::Object => "OBJECT",
            SymbolType::Notype => "NOTYPE",
            SymbolType::Section => "SECTION",
            SymbolType::File => "FILE",
            SymbolType::Tls => "TLS",
            SymbolType::Common => "COMMON",
            SymbolType::Ifunc => "IFUNC",
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symbol defined in one object file, plus the outgoing relocation names
/// found inside its byte range.
///
/// `(path, name, address)` is the stable key used to order search results
/// and to resolve ties when the same symbol exists in more than one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Absolute path of the owning object file.
    pub path: String,
    /// Raw (possibly mangled) symbol name.
    pub name: String,
    /// ELF section name, e.g. `.text`.
    pub section: String,
    /// Resolved ELF symbol type.
    pub r#type: SymbolType,
    /// Section-relative value of the symbol.
    pub address: u64,
    /// Byte size; `0` is permitted.
    pub size: u64,
    /// Object file modification time, nanoseconds since the Unix epoch.
    pub mtime_ns: u64,
    /// Best-effort source file path derived from debug info; may be empty.
    #[serde(default)]
    pub source: String,
    /// Ordered relocation target names whose patched offset falls within
    /// `[address, address + size)`. May contain empty strings and
    /// duplicates; order follows file order.
    #[serde(default)]
    pub relocations: Vec<String>,
}

impl SymbolRecord {
    /// The stable sort/merge key: `(path, address)`.
    pub fn sort_key(&self) -> (&str, u64) {
        (&self.path, self.address)
    }

    /// Half-open byte range `[address, address + size)` owned by this symbol.
    pub fn range(&self) -> std::ops::Range<u64> {
        self.address..self.address.saturating_add(self.size)
    }
}
