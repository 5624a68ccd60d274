//! Extracts defined symbols and, optionally, their relocation targets out of
//! one ELF object file.

use std::collections::HashMap;
use std::path::Path;

use memmap2::Mmap;
use object::{Object, ObjectSection, ObjectSymbol, RelocationTarget, SectionIndex, SymbolKind, SymbolSection};
use tracing::{instrument, warn};

use bdx_schema::{SymbolRecord, SymbolType};

use crate::debug_info;
use crate::error::{ElfError, Result};

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub index_relocations: bool,
    pub min_symbol_size: u64,
    pub use_dwarfdump: bool,
    pub dwarfdump_path: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            index_relocations: true,
            min_symbol_size: 0,
            use_dwarfdump: false,
            dwarfdump_path: "dwarfdump".to_string(),
        }
    }
}

/// Parse one object file into its defined symbols. `path` is recorded
/// verbatim into every record; `mtime_ns` is the caller's observed mtime at
/// the moment the file was read, not re-derived here so indexer and record
/// agree even under a racing rebuild.
#[instrument(skip(opts), fields(path = %path.display()))]
pub fn parse(path: &Path, mtime_ns: u64, opts: &ParseOptions) -> Result<Vec<SymbolRecord>> {
    let file = std::fs::File::open(path).map_err(|e| ElfError::io(path, e))?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ElfError::io(path, e))?;
    let obj = object::File::parse(&*mmap).map_err(|e| ElfError::malformed(path, e.to_string()))?;

    let mut records = Vec::new();
    let mut by_index: HashMap<usize, usize> = HashMap::new();

    for symbol in obj.symbols() {
        let Ok(name) = symbol.name() else { continue };
        if name.is_empty() {
            continue;
        }
        let Some(section_name) = defined_section_name(&obj, &symbol) else {
            continue;
        };
        let size = symbol.size();
        if size < opts.min_symbol_size {
            continue;
        }
        let address = section_relative_address(&obj, &symbol);

        by_index.insert(symbol.index().0, records.len());
        records.push(SymbolRecord {
            path: path.display().to_string(),
            name: name.to_string(),
            section: section_name,
            r#type: symbol_type(&symbol),
            address,
            size,
            mtime_ns,
            source: String::new(),
            relocations: Vec::new(),
        });
    }

    if opts.index_relocations {
        assign_relocations(&obj, &mut records, &by_index);
    }

    let sources = debug_info::resolve_sources(&obj);
    let mut fallback_source: Option<Option<String>> = None;
    for record in &mut records {
        if let Some(src) = sources.get(&record.name) {
            record.source = src.clone();
            continue;
        }
        if !opts.use_dwarfdump {
            continue;
        }
        let guess = fallback_source
            .get_or_insert_with(|| debug_info::dwarfdump_fallback(&opts.dwarfdump_path, path));
        if let Some(src) = guess {
            record.source = src.clone();
        }
    }

    Ok(records)
}

/// Name of the section a symbol is actually defined in, or `None` if the
/// symbol is undefined/absolute/unresolvable. `Common` has no backing
/// section, so it gets the conventional synthetic name.
fn defined_section_name(obj: &object::File, symbol: &object::Symbol) -> Option<String> {
    match symbol.section() {
        SymbolSection::Section(idx) => obj.section_by_index(idx).ok().and_then(|s| s.name().ok()).map(str::to_string),
        SymbolSection::Common => Some(".comm".to_string()),
        _ => None,
    }
}

fn section_relative_address(obj: &object::File, symbol: &object::Symbol) -> u64 {
    match symbol.section() {
        SymbolSection::Section(idx) => match obj.section_by_index(idx) {
            Ok(section) => symbol.address().saturating_sub(section.address()),
            Err(_) => symbol.address(),
        },
        _ => symbol.address(),
    }
}

/// Precise ELF symbol type from the raw `st_info` type nibble, falling back
/// to `object`'s coarser `SymbolKind` when the file isn't ELF-flavored
/// (never happens for us today, but `object::Symbol::flags` is the honest
/// API either way).
fn symbol_type(symbol: &object::Symbol) -> SymbolType {
    if let object::SymbolFlags::Elf { st_info, .. } = symbol.flags() {
        return match st_info & 0xf {
            object::elf::STT_OBJECT => SymbolType::Object,
            object::elf::STT_FUNC => SymbolType::Func,
            object::elf::STT_SECTION => SymbolType::Section,
            object::elf::STT_FILE => SymbolType::File,
            object::elf::STT_COMMON => SymbolType::Common,
            object::elf::STT_TLS => SymbolType::Tls,
            object::elf::STT_GNU_IFUNC => SymbolType::Ifunc,
            _ => SymbolType::Notype,
        };
    }
    match symbol.kind() {
        SymbolKind::Text => SymbolType::Func,
        SymbolKind::Data | SymbolKind::Tls => SymbolType::Object,
        SymbolKind::Section => SymbolType::Section,
        SymbolKind::File => SymbolType::File,
        _ => SymbolType::Notype,
    }
}

/// Assign every relocation in every section to the unique defined symbol
/// whose `[address, address+size)` range contains the relocation's offset
/// within that same section. A relocation whose host section carries no
/// defined symbol (or whose offset lands in no symbol's range) is dropped
/// silently; it simply isn't attributable to anything we index.
fn assign_relocations(obj: &object::File, records: &mut [SymbolRecord], by_index: &HashMap<usize, usize>) {
    let mut by_section: HashMap<SectionIndex, Vec<usize>> = HashMap::new();
    for section in obj.sections() {
        by_section.insert(section.index(), Vec::new());
    }
    for symbol in obj.symbols() {
        let Some(&record_idx) = by_index.get(&symbol.index().0) else { continue };
        if let Some(section_idx) = symbol.section_index() {
            by_section.entry(section_idx).or_default().push(record_idx);
        }
    }

    for section in obj.sections() {
        let Some(hosted) = by_section.get(&section.index()) else { continue };
        if hosted.is_empty() {
            continue;
        }
        for (offset, reloc) in section.relocations() {
            let target_name = match reloc.target() {
                RelocationTarget::Symbol(idx) => match obj.symbol_by_index(idx) {
                    Ok(symbol) => match symbol.kind() {
                        SymbolKind::Section => String::new(),
                        _ => symbol.name().unwrap_or_default().to_string(),
                    },
                    Err(_) => {
                        warn!(offset, "relocation target symbol index out of range");
                        continue;
                    }
                },
                _ => continue,
            };

            let Some(&owner) = hosted.iter().find(|&&idx| records[idx].range().contains(&offset)) else {
                continue;
            };
            records[owner].relocations.push(target_name);
        }
    }
}
