//! The external YAML loader collaborator (spec §6): a pure function from
//! text to a parsed document or an error. The parser treats any error as
//! "not yaml", never as fatal (spec §4.D, §7).

/// Parses `text` (the reassembled body of a diagnostic block, without the
/// `---`/`...` framing) into a YAML document.
pub fn load_yaml(text: &str) -> Result<serde_yaml::Value, serde_yaml::Error> {
    serde_yaml::from_str(text)
}
