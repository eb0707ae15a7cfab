//! Named placeholders inside statement text: `:name` and `${name}`.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^{}\s]+)\}|:([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder regex is valid")
});

/// One placeholder occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub span: Range<usize>,
}

/// Byte ranges covered by string literals and comments
fn masked_ranges(sql: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        match (bytes[i], bytes.get(i + 1)) {
            (b'\'', _) => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        // '' is an escaped quote inside a literal
                        if bytes.get(i + 1) == Some(&b'\'') {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            (b'-', Some(b'-')) => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            (b'/', Some(b'*')) => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 1;
            }
            _ => {
                i += 1;
                continue;
            }
        }
        i = (i + 1).min(bytes.len());
        ranges.push(start..i);
    }
    ranges
}

/// Every placeholder occurrence in textual order
pub fn scan(sql: &str) -> Vec<Placeholder> {
    let masked = masked_ranges(sql);
    PLACEHOLDER
        .captures_iter(sql)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if masked.iter().any(|r| r.contains(&whole.start())) {
                return None;
            }
            if let Some(name) = caps.get(1) {
                return Some(Placeholder {
                    name: name.as_str().to_string(),
                    span: whole.range(),
                });
            }
            // `::int` is a cast, `a:b` is not a parameter either
            let before = sql[..whole.start()].chars().next_back();
            if matches!(before, Some(c) if c == ':' || c.is_alphanumeric() || c == '_') {
                return None;
            }
            caps.get(2).map(|name| Placeholder {
                name: name.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Distinct placeholder names in order of first appearance
pub fn names(sql: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for placeholder in scan(sql) {
        if !names.contains(&placeholder.name) {
            names.push(placeholder.name);
        }
    }
    names
}

/// Rewrite named placeholders to `$1..$n`.
///
/// Returns the rewritten statement and the parameter name bound to each
/// position. Repeated names reuse their first position.
pub fn to_positional(sql: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(sql.len());
    let mut order: Vec<String> = Vec::new();
    let mut last = 0;
    for placeholder in scan(sql) {
        let position = match order.iter().position(|n| *n == placeholder.name) {
            Some(i) => i + 1,
            None => {
                order.push(placeholder.name);
                order.len()
            }
        };
        out.push_str(&sql[last..placeholder.span.start]);
        out.push('$');
        out.push_str(&position.to_string());
        last = placeholder.span.end;
    }
    out.push_str(&sql[last..]);
    (out, order)
}
