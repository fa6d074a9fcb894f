//! Component A — the line classifier.
//!
//! [`classify`] matches one already-dechunked, `\n`-terminated line (with
//! the parser's indent prefix already stripped) against the fixed set of TAP
//! line shapes from spec §4.A. Shapes are tried in priority order and the
//! first match wins; unmatched lines are left for the caller to route as a
//! comment, a diagnostic/child continuation, or garbage, depending on
//! ambient parser state that this module deliberately knows nothing about.

/// A line classified into one of the fixed TAP shapes, or left unclassified.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<'a> {
    TestPoint {
        negated: bool,
        id: Option<i32>,
        rest: &'a str,
    },
    Pragma {
        enabled: bool,
        name: &'a str,
    },
    BailOut {
        reason: Option<&'a str>,
    },
    Version {
        version: u32,
    },
    Plan {
        start: i32,
        end: i32,
        comment: Option<&'a str>,
    },
    /// None of the above; caller decides what to do with it.
    Other,
}

/// Strips a single trailing `\n` (and, if present, the `\r` before it — the
/// caller normalises CRLF before calling `classify`, but this keeps the
/// function safe to use directly on raw slices too).
fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|s| s.strip_suffix('\r').unwrap_or(s))
        .unwrap_or(line)
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Tries the test-point shape: `^(not )?ok( <id>)?(( -)? <rest>)?$` with the
/// `ok`/`not ok` keyword matched case-insensitively.
pub(crate) fn classify_test_point(body: &str) -> Option<(bool, Option<i32>, &str)> {
    let lower_prefix_len = |s: &str, kw: &str| -> Option<usize> {
        if s.get(..kw.len())?.eq_ignore_ascii_case(kw) {
            Some(kw.len())
        } else {
            None
        }
    };

    let (negated, after_kw) = if let Some(n) = lower_prefix_len(body, "not ok") {
        (true, &body[n..])
    } else if let Some(n) = lower_prefix_len(body, "ok") {
        (false, &body[n..])
    } else {
        return None;
    };

    // after_kw must be empty, or start with whitespace (separating it from
    // an id/description), to avoid matching e.g. "okay" as a test point.
    if !after_kw.is_empty() && !after_kw.starts_with(char::is_whitespace) {
        return None;
    }

    let mut rest = after_kw.trim_start_matches([' ', '\t']);

    // Optional numeric id.
    let digit_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let id = if digit_len > 0 {
        let (num, tail) = rest.split_at(digit_len);
        // The digits must be followed by whitespace, `-`, `#`, or end of
        // line, else they're part of a description glued to the keyword
        // (e.g. "ok123" is not an id).
        if tail.is_empty() || tail.starts_with([' ', '\t', '-', '#']) {
            rest = tail;
            num.parse::<i32>().ok()
        } else {
            None
        }
    } else {
        None
    };

    let rest = rest.trim_start_matches([' ', '\t']);
    Some((negated, id, rest))
}

pub(crate) fn classify_pragma(body: &str) -> Option<(bool, &str)> {
    let lower = body.get(..7)?;
    if !eq_ignore_case(lower, "pragma ") {
        return None;
    }
    let tail = &body[7..];
    let mut chars = tail.char_indices();
    let (_, sign) = chars.next()?;
    let enabled = match sign {
        '+' => true,
        '-' => false,
        _ => return None,
    };
    let name_start = 1;
    let name = &tail[name_start..];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_lowercase()) {
        return None;
    }
    Some((enabled, name))
}

pub(crate) fn classify_bail_out(body: &str) -> Option<Option<&str>> {
    const KW: &str = "bail out!";
    if !body.get(..KW.len())?.eq_ignore_ascii_case(KW) {
        return None;
    }
    let reason = body[KW.len()..].trim();
    Some(if reason.is_empty() { None } else { Some(reason) })
}

pub(crate) fn classify_version(body: &str) -> Option<u32> {
    const KW: &str = "tap version ";
    if !body.get(..KW.len())?.eq_ignore_ascii_case(KW) {
        return None;
    }
    let tail = body[KW.len()..].trim();
    if !tail.chars().all(|c| c.is_ascii_digit()) || tail.is_empty() {
        return None;
    }
    tail.parse::<u32>().ok()
}

pub(crate) fn classify_plan(body: &str) -> Option<(i32, i32, Option<&str>)> {
    let dot_dot = body.find("..")?;
    let (start_str, tail) = body.split_at(dot_dot);
    if start_str.is_empty() || !start_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let tail = &tail[2..];
    let end_digit_len = tail.chars().take_while(|c| c.is_ascii_digit()).count();
    if end_digit_len == 0 {
        return None;
    }
    let (end_str, rest) = tail.split_at(end_digit_len);

    let rest = rest.trim_start_matches([' ', '\t']);
    let comment = if let Some(hash) = rest.strip_prefix('#') {
        Some(hash.trim_start_matches([' ', '\t']))
    } else if rest.is_empty() {
        None
    } else {
        return None;
    };

    let start = start_str.parse::<i32>().ok()?;
    let end = end_str.parse::<i32>().ok()?;
    Some((start, end, comment))
}

/// Classifies one complete line (the trailing `\n`, if any, is ignored; an
/// indent prefix must already have been stripped by the caller).
pub fn classify(line: &str) -> Line<'_> {
    let body = strip_newline(line);

    if let Some(reason) = classify_bail_out(body) {
        return Line::BailOut { reason };
    }
    if let Some((enabled, name)) = classify_pragma(body) {
        return Line::Pragma { enabled, name };
    }
    if let Some(version) = classify_version(body) {
        return Line::Version { version };
    }
    if let Some((start, end, comment)) = classify_plan(body) {
        return Line::Plan {
            start,
            end,
            comment,
        };
    }
    if let Some((negated, id, rest)) = classify_test_point(body) {
        return Line::TestPoint { negated, id, rest };
    }

    Line::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_plain_ok() {
        assert_eq!(
            classify("ok\n"),
            Line::TestPoint {
                negated: false,
                id: None,
                rest: ""
            }
        );
    }

    #[test]
    fn matches_not_ok_with_id_and_name() {
        assert_eq!(
            classify("not ok 42 - frobnicate widget\n"),
            Line::TestPoint {
                negated: true,
                id: Some(42),
                rest: "frobnicate widget"
            }
        );
    }

    #[test]
    fn matches_ok_with_dash_description() {
        assert_eq!(
            classify("ok 1 - hello world\n"),
            Line::TestPoint {
                negated: false,
                id: Some(1),
                rest: "hello world"
            }
        );
    }

    #[test]
    fn rejects_okay_as_test_point() {
        assert_eq!(classify("okay, fine\n"), Line::Other);
    }

    #[test]
    fn matches_plan_with_comment() {
        assert_eq!(
            classify("1..5 # generated\n"),
            Line::Plan {
                start: 1,
                end: 5,
                comment: Some("generated")
            }
        );
    }

    #[test]
    fn matches_skip_all_plan() {
        assert_eq!(
            classify("1..0 # nothing to do\n"),
            Line::Plan {
                start: 1,
                end: 0,
                comment: Some("nothing to do")
            }
        );
    }

    #[test]
    fn matches_version_case_insensitive() {
        assert_eq!(classify("tAp VeRsIoN 13\n"), Line::Version { version: 13 });
    }

    #[test]
    fn matches_bail_out_case_insensitive() {
        assert_eq!(
            classify("BaIl OuT! kaboom\n"),
            Line::BailOut {
                reason: Some("kaboom")
            }
        );
    }

    #[test]
    fn matches_pragma() {
        assert_eq!(
            classify("pragma +strict\n"),
            Line::Pragma {
                enabled: true,
                name: "strict"
            }
        );
    }

    #[test]
    fn matches_nothing_for_comment() {
        assert_eq!(classify("# just a comment\n"), Line::Other);
    }

    #[test]
    fn strips_crlf_before_matching() {
        assert_eq!(
            classify("1..1\r\n"),
            Line::Plan {
                start: 1,
                end: 1,
                comment: None
            }
        );
    }

    /// A multi-byte leading character whose byte length doesn't land on a
    /// keyword-length char boundary must be classified as `Other`, not
    /// panic on a mid-character slice (every classifier here used to slice
    /// `body[..kw.len()]` unconditionally).
    #[test]
    fn multibyte_leading_character_does_not_panic_test_point() {
        assert_eq!(classify("€x\n"), Line::Other);
    }

    #[test]
    fn multibyte_character_straddling_bail_out_keyword_length_does_not_panic() {
        // "bail out!".len() == 9; the 3-byte '€' starting at byte 8 straddles
        // that boundary, the exact slice point `classify_bail_out` used to
        // index into unconditionally.
        assert_eq!(classify_bail_out("12345678\u{20AC}"), None);
    }

    #[test]
    fn multibyte_character_straddling_version_keyword_length_does_not_panic() {
        // "tap version ".len() == 12; the '€' starting at byte 11 straddles it.
        assert_eq!(classify_version("12345678901\u{20AC}"), None);
    }
}
