//! DOT format utilities for graph visualization.

/// Escapes a string for safe use in DOT labels.
///
/// Handles quotes, backslashes, newlines and angle brackets, all of which
/// carry meaning in DOT record labels.
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}
