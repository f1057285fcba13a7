//! Helpers for `ILIKE` filters built from user input.

/// Wraps `raw` as a substring pattern with `%`, `_` and `\` taken literally.
/// Pair with `ESCAPE '\'` in the query.
pub fn contains_pattern(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for ch in raw.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}
