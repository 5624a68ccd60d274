//! Identifier and path tokenization.
//!
//! `name` and `source` are split at CamelCase, snake_case, and digit-run
//! boundaries; `path` is split on path separators. Tokens are case-folded
//! for lookup but the original string is always kept as the whole-term
//! value, so display never loses case.

/// Split an identifier-like string into lowercase sub-tokens.
///
/// `CppCamelCaseSymbol` -> `["cpp", "camel", "case", "symbol"]`.
/// `parse_http2_request` -> `["parse", "http", "2", "request"]`.
pub fn tokenize_identifier(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = s.chars().collect();

    for i in 0..chars.len() {
        let c = chars[i];
        if c == '_' || c == '-' || c == '.' {
            flush(&mut current, &mut tokens);
            continue;
        }

        if !current.is_empty() {
            let prev = *current.as_bytes().last().unwrap() as char;
            let boundary = class_of(prev) != class_of(c)
                // UpperUpperLower: "HTTPRequest" -> "HTTP" | "Request"
                || (class_of(prev) == CharClass::Upper
                    && class_of(c) == CharClass::Upper
                    && i + 1 < chars.len()
                    && class_of(chars[i + 1]) == CharClass::Lower);
            if boundary {
                flush(&mut current, &mut tokens);
            }
        }
        current.push(c);
    }
    flush(&mut current, &mut tokens);
    tokens
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum CharClass {
    Upper,
    Lower,
    Digit,
    Other,
}

fn class_of(c: char) -> CharClass {
    if c.is_ascii_uppercase() {
        CharClass::Upper
    } else if c.is_ascii_lowercase() {
        CharClass::Lower
    } else if c.is_ascii_digit() {
        CharClass::Digit
    } else {
        CharClass::Other
    }
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(current.to_ascii_lowercase());
        current.clear();
    }
}

/// Split a filesystem path into its non-empty, lowercase components.
pub fn tokenize_path(s: &str) -> Vec<String> {
    s.split(['/', '\\'])
        .filter(|c| !c.is_empty())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
