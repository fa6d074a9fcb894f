//! Component D — the diagnostic block tracker.
//!
//! A [`DiagnosticBlock`] only ever exists while the owning parser's
//! `current` assertion is pending, is born on an indented `---` line and
//! dies on a matching `...` (success, handed to the YAML loader) or on a
//! dedent/shape break (emitted as non-TAP `extra`, spec §4.D). This module
//! only holds the accumulation state and the pure predicates over it; the
//! surrounding control flow — deciding when to open one, routing lines into
//! it, and reacting to its outcome — lives in [`crate::parser`] alongside
//! the rest of the main state machine, since that's the only place with
//! access to the pending assertion the block is attached to.

/// The indent prefix and accumulated body of an in-progress diagnostic
/// block (spec §3's `diag_indent`/`diag_text`).
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticBlock {
    pub indent: String,
    text: String,
}

impl DiagnosticBlock {
    pub fn new(indent: String) -> Self {
        Self {
            indent,
            text: String::new(),
        }
    }

    /// Whether `line` (newline already stripped) is still inside this
    /// block's indent, i.e. a continuation or closing candidate.
    pub fn extends(&self, line: &str) -> bool {
        line.starts_with(self.indent.as_str())
    }

    /// Whether `line` is this block's closing `...` marker.
    pub fn is_closing(&self, line: &str) -> bool {
        line.strip_prefix(self.indent.as_str()) == Some("...")
    }

    /// Appends one line of block content (relative to the parser's own
    /// indent, i.e. still including `diag_indent`).
    pub fn push(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// The accumulated YAML body, handed to [`crate::yaml::load_yaml`].
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Reassembles `<diag_indent>---\n<diag_text>` for emission as non-TAP
    /// `extra` when the block fails to parse as YAML or is broken by a
    /// shape mismatch before it's closed.
    pub fn reassemble(&self) -> String {
        format!("{}---\n{}", self.indent, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extends_while_indent_matches() {
        let block = DiagnosticBlock::new("  ".to_string());
        assert!(block.extends("  got: 1"));
        assert!(!block.extends("not indented"));
    }

    #[test]
    fn recognises_closing_marker() {
        let block = DiagnosticBlock::new("  ".to_string());
        assert!(block.is_closing("  ..."));
        assert!(!block.is_closing("  ....")); // not an exact match
        assert!(!block.is_closing("  got: 1"));
    }

    #[test]
    fn reassembles_with_framing() {
        let mut block = DiagnosticBlock::new("  ".to_string());
        block.push("  got: 1");
        block.push("  want: 2");
        assert_eq!(block.reassemble(), "  ---\n  got: 1\n  want: 2\n");
    }
}
