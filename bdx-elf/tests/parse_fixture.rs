//! Drives `bdx_elf::parse` against a real ELF relocatable object instead of
//! synthetic records, exercising the scenarios from spec §8 end to end. The
//! fixture is built in-process with `object::write` rather than shipped as a
//! prebuilt binary, so the test has no toolchain dependency of its own.

use object::write::{Object, Relocation, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, RelocationEncoding, RelocationFlags, RelocationKind,
    SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};

use bdx_elf::{parse, ParseOptions};
use bdx_schema::SymbolType;

/// `cxx_function`, `CppCamelCaseSymbol`, `uses_c_function` in `.text`; `bar`
/// in `.data`; `uses_c_function` carries one relocation against the
/// undefined symbol `c_function`. No `memset` symbol exists anywhere.
fn build_fixture() -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);

    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.section_mut(text).set_data(vec![0u8; 64], 16);

    let data = obj.add_section(Vec::new(), b".data".to_vec(), SectionKind::Data);
    obj.section_mut(data).set_data(vec![0u8; 16], 8);

    let c_function = obj.add_symbol(Symbol {
        name: b"c_function".to_vec(),
        value: 0,
        size: 0,
        kind: SymbolKind::Text,
        scope: SymbolScope::Dynamic,
        weak: false,
        section: SymbolSection::Undefined,
        flags: SymbolFlags::None,
    });

    obj.add_symbol(Symbol {
        name: b"cxx_function".to_vec(),
        value: 0,
        size: 16,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(text),
        flags: SymbolFlags::None,
    });

    obj.add_symbol(Symbol {
        name: b"CppCamelCaseSymbol".to_vec(),
        value: 16,
        size: 16,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(text),
        flags: SymbolFlags::None,
    });

    obj.add_symbol(Symbol {
        name: b"uses_c_function".to_vec(),
        value: 32,
        size: 16,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(text),
        flags: SymbolFlags::None,
    });

    obj.add_symbol(Symbol {
        name: b"bar".to_vec(),
        value: 0,
        size: 4,
        kind: SymbolKind::Data,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(data),
        flags: SymbolFlags::None,
    });

    // Offset 36 falls inside `uses_c_function`'s [32, 48) range.
    obj.add_relocation(
        text,
        Relocation {
            offset: 36,
            symbol: c_function,
            addend: 0,
            flags: RelocationFlags::Generic {
                kind: RelocationKind::Absolute,
                encoding: RelocationEncoding::Generic,
                size: 32,
            },
        },
    )
    .expect("relocation host section has a defined symbol covering the offset");

    obj.write().expect("writing a minimal ELF relocatable object never fails")
}

fn write_fixture() -> tempfile::NamedTempFile {
    let bytes = build_fixture();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, &bytes).unwrap();
    file
}

#[test]
fn camel_case_symbol_is_recovered_verbatim() {
    let file = write_fixture();
    let records = parse(file.path(), 0, &ParseOptions::default()).unwrap();
    let hit = records.iter().find(|r| r.name == "CppCamelCaseSymbol");
    assert!(hit.is_some(), "expected CppCamelCaseSymbol among {records:?}");
}

#[test]
fn bar_is_a_data_object_distinct_from_cxx_function() {
    let file = write_fixture();
    let records = parse(file.path(), 0, &ParseOptions::default()).unwrap();
    let bar = records.iter().find(|r| r.name == "bar").expect("bar is defined");
    assert_eq!(bar.r#type, SymbolType::Object);
    assert_eq!(bar.section, ".data");
    assert!(records.iter().any(|r| r.name == "cxx_function"));
}

#[test]
fn relocation_to_c_function_is_attributed_only_to_uses_c_function() {
    let file = write_fixture();
    let records = parse(file.path(), 0, &ParseOptions::default()).unwrap();
    let uses = records.iter().find(|r| r.name == "uses_c_function").expect("defined");
    assert_eq!(uses.relocations, vec!["c_function".to_string()]);

    for other in records.iter().filter(|r| r.name != "uses_c_function") {
        assert!(!other.relocations.contains(&"c_function".to_string()));
    }
    assert!(!records.iter().any(|r| r.relocations.iter().any(|t| t == "memset")));
}

#[test]
fn type_func_and_section_text_excludes_the_data_symbol() {
    let file = write_fixture();
    let records = parse(file.path(), 0, &ParseOptions::default()).unwrap();
    let func_in_text: Vec<_> =
        records.iter().filter(|r| r.r#type == SymbolType::Func && r.section == ".text").collect();

    assert!(func_in_text.iter().any(|r| r.name == "uses_c_function"));
    assert!(func_in_text.iter().all(|r| r.name != "bar"));
}
