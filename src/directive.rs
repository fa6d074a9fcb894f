//! Component B — the directive parser.
//!
//! Operates on the already-dash-stripped `rest` of a test-point line. Splits
//! off a trailing directive at the first `#` that isn't escaped by
//! backslashes, then classifies that directive as a `time=`, `todo`, or
//! `skip` marker — or folds it back into the name if it's none of those.

use crate::event::Reason;

/// The directive extracted from a test-point's trailing `# ...` comment.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Time(u64),
    Todo(Reason),
    Skip(Reason),
}

/// Splits `rest` into `(name, directive_text)` at the first unescaped `#`.
///
/// A `#` is escaped (and thus part of the name) iff it is immediately
/// preceded by an odd number of backslashes; an even count (including zero)
/// means the `#` starts the directive. Implemented as an explicit byte
/// scanner, per spec §9, rather than a single regex, so the backslash
/// counting stays auditable.
pub fn split_directive(rest: &str) -> (&str, Option<&str>) {
    let bytes = rest.as_bytes();
    let mut backslashes = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => backslashes += 1,
            b'#' if backslashes % 2 == 0 => {
                return (rest[..i].trim_end(), Some(&rest[i + 1..]));
            }
            _ => backslashes = 0,
        }
        i += 1;
    }
    (rest.trim_end(), None)
}

/// Parses a `time=<number><ms|s>` directive body into milliseconds.
///
/// A seconds value is converted with a fixed-point dance (scale by 10^6,
/// round, divide by 10^3) so the conversion is deterministic across
/// platforms instead of depending on floating-point rounding modes.
fn parse_time(text: &str) -> Option<u64> {
    let text = text.strip_prefix("time=")?;
    let (number, unit) = if let Some(n) = text.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = text.strip_suffix('s') {
        (n, "s")
    } else {
        return None;
    };
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    match unit {
        "ms" => Some((value.round()) as u64),
        "s" => {
            let scaled = (value * 1_000_000.0).round();
            Some((scaled / 1_000.0).round() as u64)
        }
        _ => unreachable!(),
    }
}

/// Parses a `todo`/`skip` directive body, case-insensitively, returning the
/// kind and either its trimmed reason text or [`Reason::Flag(true)`] if none
/// followed.
fn parse_todo_or_skip(text: &str) -> Option<Directive> {
    let lower_len = |kw: &str| -> Option<usize> {
        if text.get(..kw.len())?.eq_ignore_ascii_case(kw) {
            Some(kw.len())
        } else {
            None
        }
    };
    let (is_todo, kw_len) = if let Some(n) = lower_len("todo") {
        (true, n)
    } else if let Some(n) = lower_len("skip") {
        (false, n)
    } else {
        return None;
    };
    if text.len() > kw_len {
        let next = text.as_bytes()[kw_len];
        if !next.is_ascii_whitespace() && next != b':' {
            // e.g. "todoist" is not the "todo" keyword.
            return None;
        }
    }
    let remainder = text[kw_len..].trim_start_matches([' ', '\t', ':']).trim();
    let reason = if remainder.is_empty() {
        Reason::present()
    } else {
        Reason::text(remainder)
    };
    Some(if is_todo {
        Directive::Todo(reason)
    } else {
        Directive::Skip(reason)
    })
}

/// Parses the `rest` of a test-point (leading `-` already stripped) into a
/// `(name, directive)` pair. When the trailing `#...` text is neither a
/// `time=` marker nor a `todo`/`skip` directive, it's folded back into the
/// name with the `#` restored, exactly as spec §4.B requires.
pub fn parse(rest: &str) -> (String, Option<Directive>) {
    let (name, tail) = split_directive(rest);
    match tail {
        None => (name.trim().to_string(), None),
        Some(tail) => {
            let trimmed = tail.trim();
            if let Some(ms) = parse_time(trimmed) {
                (name.trim().to_string(), Some(Directive::Time(ms)))
            } else if let Some(directive) = parse_todo_or_skip(trimmed) {
                (name.trim().to_string(), Some(directive))
            } else {
                let mut full_name = name.trim_end().to_string();
                full_name.push('#');
                full_name.push_str(tail);
                (full_name.trim().to_string(), None)
            }
        }
    }
}
