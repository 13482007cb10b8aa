//! Identifier quoting and statement text helpers
//!
//! Identifiers are always quoted; values never appear in statement text and
//! are passed as bound parameters instead.

/// Quote an SQLite identifier, doubling any embedded double quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma separated list of quoted identifiers
pub fn column_list<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `?` placeholders for `count` bound parameters
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
