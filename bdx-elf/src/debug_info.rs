//! Best-effort source-file resolution from DWARF: walk every compilation
//! unit's subprograms and record the decl file for each linkage name we
//! can resolve. `.debug_info` in a relocatable object still carries
//! unapplied relocations (e.g. against `.debug_str`/`.debug_line`
//! offsets), so section bytes are patched before gimli ever sees them.

use std::borrow::Cow;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use gimli::{Dwarf, RunTimeEndian};
use object::{Object, ObjectSection};
use tracing::debug;

/// `linkage name -> resolved source path`, built once per object file.
pub fn resolve_sources(obj: &object::File) -> HashMap<String, String> {
    match try_resolve_sources(obj) {
        Ok(map) => map,
        Err(e) => {
            debug!(error = %e, "no usable DWARF debug info");
            HashMap::new()
        }
    }
}

fn try_resolve_sources(obj: &object::File) -> gimli::Result<HashMap<String, String>> {
    let endian = if obj.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };

    let owned = Dwarf::load(|id| load_section(obj, id))?;
    let dwarf = owned.borrow(|section| gimli::EndianSlice::new(section, endian));

    let mut out = HashMap::new();
    let mut units = dwarf.units();
    while let Some(header) = units.next()? {
        let unit = dwarf.unit(header)?;
        let Some(line_program) = &unit.line_program else {
            continue;
        };
        let header = line_program.header();
        let compdir = path_from_opt_slice(unit.comp_dir);

        let mut entries = unit.entries();
        while let Some((_, entry)) = entries.next_dfs()? {
            if entry.tag() != gimli::DW_TAG_subprogram {
                continue;
            }
            let Ok(Some(name_attr)) = entry.attr_value(gimli::DW_AT_linkage_name) else {
                continue;
            };
            let Ok(name) = dwarf.attr_string(&unit, name_attr) else {
                continue;
            };
            let Ok(Some(gimli::AttributeValue::FileIndex(file_index))) =
                entry.attr_value(gimli::DW_AT_decl_file)
            else {
                continue;
            };
            let Some(file) = header.file(file_index) else {
                continue;
            };

            let mut path = compdir.clone();
            if let Some(dir_attr) = file.directory(header) {
                if let Ok(dir) = dwarf.attr_string(&unit, dir_attr) {
                    push_bytes(&mut path, dir.slice());
                }
            }
            let Ok(file_name) = dwarf.attr_string(&unit, file.path_name()) else {
                continue;
            };
            push_bytes(&mut path, file_name.slice());

            let name = String::from_utf8_lossy(name.slice()).into_owned();
            out.entry(name).or_insert_with(|| path.to_string_lossy().into_owned());
        }
    }
    Ok(out)
}

fn path_from_opt_slice(slice: Option<gimli::EndianSlice<RunTimeEndian>>) -> PathBuf {
    match slice {
        Some(s) => PathBuf::from(OsStr::from_bytes(s.slice())),
        None => PathBuf::new(),
    }
}

fn push_bytes(path: &mut PathBuf, bytes: &[u8]) {
    path.push(OsStr::from_bytes(bytes));
}

/// Load one DWARF section, applying any relocations against it first. Build
/// directories ship relocatable `.o` files where `.debug_info` et al still
/// reference `.debug_str` by unresolved offset.
fn load_section(obj: &object::File, id: gimli::SectionId) -> Result<Cow<'static, [u8]>, gimli::Error> {
    let Some(section) = obj.section_by_name(id.name()) else {
        return Ok(Cow::Borrowed(&[]));
    };
    let Ok(data) = section.uncompressed_data() else {
        return Ok(Cow::Borrowed(&[]));
    };
    let mut data = data.into_owned();
    for (offset, rel) in section.relocations() {
        let offset = offset as usize;
        let size = (rel.size() / 8) as usize;
        if size == 0 || offset.saturating_add(size) > data.len() {
            continue;
        }
        let Ok(mut value) = load_var_int(offset, size, &data) else {
            continue;
        };
        if let object::RelocationKind::Absolute = rel.kind() {
            value = if rel.has_implicit_addend() {
                value.wrapping_add(rel.addend())
            } else {
                rel.addend()
            };
        }
        let _ = store_var_int(offset, size, &mut data, value);
    }
    Ok(Cow::Owned(data))
}

fn load_var_int(offset: usize, size: usize, data: &[u8]) -> Result<i64, gimli::Error> {
    let bytes = data.get(offset..offset + size).ok_or(gimli::Error::InvalidAddressRange)?;
    Ok(match size {
        4 => i32::from_le_bytes(bytes.try_into().unwrap()) as i64,
        8 => i64::from_le_bytes(bytes.try_into().unwrap()),
        _ => return Err(gimli::Error::UnsupportedFieldSize((size * 8) as u8)),
    })
}

fn store_var_int(offset: usize, size: usize, data: &mut [u8], value: i64) -> Result<(), gimli::Error> {
    let slot = data.get_mut(offset..offset + size).ok_or(gimli::Error::InvalidAddressRange)?;
    slot.copy_from_slice(&value.to_le_bytes()[..size]);
    Ok(())
}

/// Shell out to an external `dwarfdump`-equivalent when an object carries no
/// usable embedded DWARF. Best-effort: a single aggregate guess for the
/// whole file, applied to every symbol still missing a `source`. Output is
/// capped so a pathological binary can't stall the indexer behind a giant
/// pipe read.
pub fn dwarfdump_fallback(dwarfdump_path: &str, object_path: &std::path::Path) -> Option<String> {
    const MAX_STDOUT_BYTES: usize = 64 * 1024;

    let output = std::process::Command::new(dwarfdump_path)
        .arg("--name-lookup")
        .arg(object_path)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = if output.stdout.len() > MAX_STDOUT_BYTES {
        &output.stdout[..MAX_STDOUT_BYTES]
    } else {
        &output.stdout[..]
    };
    let text = String::from_utf8_lossy(stdout);
    text.lines()
        .find_map(|line| line.strip_prefix("DW_AT_decl_file:").map(|p| p.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dwarfdump_fallback_returns_none_for_missing_binary() {
        let path = std::path::Path::new("/build/a.o");
        assert!(dwarfdump_fallback("/no/such/dwarfdump-tool", path).is_none());
    }
}
