//! Line classification heuristics: panic headers, logger timestamp
//! headers, and JSON object lines.
//!
//! Pure byte-level predicates used by [`crate::merge::Merger`] to decide
//! whether a physical line starts a new logical event or continues the
//! previous one. These never fail; malformed input simply does not match.

const PANIC_PREFIX: &[u8] = b"panic: ";

/// Digit-class templates for the timestamp shapes the standard logger
/// emits, longest first so the most specific one wins. Every non-digit
/// byte must match exactly; every digit position only requires an ASCII
/// digit, not the same value.
const LOG_TEMPLATES: [&[u8]; 5] = [
    b"2000/01/02 12:00:00.000000 ",
    b"2000/01/02 12:00:00 ",
    b"12:00:00.000000 ",
    b"2000/01/02 ",
    b"12:00:00 ",
];

/// Returns true if the line is the first line of a panic.
pub fn is_panic_header(line: &[u8]) -> bool {
    line.starts_with(PANIC_PREFIX)
}

/// Match a logger header (`prefix` followed by one of the timestamp
/// templates) at the start of `line`.
///
/// Returns the offset into `line` where the message text begins, i.e.
/// just past `prefix + template`, or `None` when no template matches.
pub fn log_header_end(line: &[u8], prefix: &[u8]) -> Option<usize> {
    if line.len() < prefix.len() || !line.starts_with(prefix) {
        return None;
    }
    let rest = &line[prefix.len()..];
    LOG_TEMPLATES
        .iter()
        .find(|template| matches_template(rest, template))
        .map(|template| prefix.len() + template.len())
}

/// Heuristic JSON object check: first two and last two bytes only.
///
/// This can false-positive on lines that merely start with `{"` and end
/// with `"}` and miss objects without a leading string key. The escaping
/// vs. pass-through contract in the accumulator depends on exactly this
/// check, so it must not be replaced by real JSON validation.
pub fn is_json_object(line: &[u8]) -> bool {
    line.len() >= 4 && line.starts_with(b"{\"") && line.ends_with(b"\"}")
}

fn matches_template(line: &[u8], template: &[u8]) -> bool {
    if line.len() < template.len() {
        return false;
    }
    template.iter().zip(line).all(|(&t, &b)| {
        if t.is_ascii_digit() {
            b.is_ascii_digit()
        } else {
            t == b
        }
    })
}
