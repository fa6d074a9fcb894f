//! Component E — subtest (child) spawn helpers.
//!
//! A subtest is just another [`crate::Parser`] instance (spec §9 "recursive
//! parser tree"), so this module holds only the pure predicates the main
//! state machine needs to decide *when* to spawn one: whether an indented
//! line's content (after its own leading whitespace) matches a top-level TAP
//! shape (the streamed path), and how to split a line into its leading
//! whitespace and remainder.

use crate::classify::{classify, Line};

/// Whether `content` — already stripped of the parser's own indent, with its
/// own further leading whitespace still attached — looks like it could be a
/// line in a nested TAP stream, triggering a *streamed* child spawn (spec
/// §4.E path 1).
pub fn looks_like_top_level_shape(content: &str) -> bool {
    !matches!(classify(content), Line::Other)
}

/// Splits `line` into its leading run of spaces/tabs and the remainder.
pub fn split_indent(line: &str) -> (&str, &str) {
    let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
    line.split_at(indent_len)
}

/// A test-point name ending in `{` opens a *buffered* subtest (spec §4.E
/// path 2); returns the name with the trailing `{` removed and trimmed.
pub fn strip_buffered_marker(name: &str) -> Option<&str> {
    name.strip_suffix('{').map(str::trim_end)
}
