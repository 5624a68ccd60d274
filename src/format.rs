//! Renders [`SymbolRecord`]s to the three output formats in spec §6:
//! newline-delimited JSON, S-expressions, and a printf-style field template.
//! Purely presentational; the searcher and graph engine never see this.

use bdx_schema::SymbolRecord;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Json,
    Sexp,
    Template(String),
}

impl OutputFormat {
    pub fn parse(spec: &str) -> OutputFormat {
        match spec {
            "json" => OutputFormat::Json,
            "sexp" => OutputFormat::Sexp,
            other => OutputFormat::Template(other.to_string()),
        }
    }
}

/// `demangled` is only ever populated when the caller asked for
/// `--demangle-names`; demangling itself lives in [`crate::demangle`] and is
/// computed on demand, never stored in the index.
pub fn render(format: &OutputFormat, record: &SymbolRecord, demangled: Option<&str>) -> String {
    match format {
        OutputFormat::Json => render_json(record, demangled),
        OutputFormat::Sexp => render_sexp(record, demangled),
        OutputFormat::Template(tmpl) => render_template(tmpl, record, demangled),
    }
}

fn render_json(record: &SymbolRecord, demangled: Option<&str>) -> String {
    let mut value = serde_json::json!({
        "path": record.path,
        "name": record.name,
        "section": record.section,
        "address": record.address,
        "size": record.size,
        "type": record.r#type.as_str(),
        "relocations": record.relocations,
        "mtime": record.mtime_ns,
    });
    if let Some(d) = demangled {
        value["demangled"] = serde_json::Value::String(d.to_string());
    }
    value.to_string()
}

fn render_sexp(record: &SymbolRecord, demangled: Option<&str>) -> String {
    let relocations = record
        .relocations
        .iter()
        .map(|r| sexp_string(r))
        .collect::<Vec<_>>()
        .join(" ");
    let mut out = format!(
        "(path {} name {} section {} type {} address {} size {} mtime {} relocations ({}))",
        sexp_string(&record.path),
        sexp_string(&record.name),
        sexp_string(&record.section),
        record.r#type.as_str(),
        record.address,
        record.size,
        record.mtime_ns,
        relocations,
    );
    if let Some(d) = demangled {
        out.pop();
        out.push_str(&format!(" demangled {})", sexp_string(d)));
    }
    out
}

fn sexp_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Substitutes `%field` tokens with the matching field's value; `%%` is a
/// literal `%`. Unknown or absent fields render as empty, per spec §6.
fn render_template(tmpl: &str, record: &SymbolRecord, demangled: Option<&str>) -> String {
    let mut out = String::with_capacity(tmpl.len());
    let mut chars = tmpl.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut field = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                field.push(next);
                chars.next();
            } else {
                break;
            }
        }
        out.push_str(&field_value(&field, record, demangled).unwrap_or_default());
    }
    out
}

fn field_value(field: &str, record: &SymbolRecord, demangled: Option<&str>) -> Option<String> {
    Some(match field {
        "path" => record.path.clone(),
        "name" => record.name.clone(),
        "fullname" => record.name.clone(),
        "section" => record.section.clone(),
        "type" => record.r#type.as_str().to_string(),
        "address" => format!("{:#x}", record.address),
        "size" => record.size.to_string(),
        "mtime" => record.mtime_ns.to_string(),
        "source" => record.source.clone(),
        "relocations" => record.relocations.join(","),
        "demangled" => demangled.unwrap_or_default().to_string(),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdx_schema::SymbolType;

    fn rec() -> SymbolRecord {
        SymbolRecord {
            path: "/build/a.o".into(),
            name: "_ZN3foo3barEv".into(),
            section: ".text".into(),
            r#type: SymbolType::Func,
            address: 0x10,
            size: 4,
            mtime_ns: 1,
            source: "a.cpp".into(),
            relocations: vec!["helper".into()],
        }
    }

    #[test]
    fn json_includes_demangled_only_when_given() {
        let without = render_json(&rec(), None);
        assert!(!without.contains("demangled"));
        let with = render_json(&rec(), Some("foo::bar()"));
        assert!(with.contains("\"demangled\":\"foo::bar()\""));
    }

    #[test]
    fn template_substitutes_known_fields_and_blanks_unknown() {
        let out = render_template("%name@%address unknown=%bogus%%", &rec(), None);
        assert_eq!(out, "_ZN3foo3barEv@0x10 unknown=%");
    }

    #[test]
    fn sexp_escapes_quotes_in_strings() {
        let mut r = rec();
        r.name = "weird\"name".into();
        let out = render_sexp(&r, None);
        assert!(out.contains(r#"weird\"name"#));
    }
}
