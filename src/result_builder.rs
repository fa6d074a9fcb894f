//! Component C — the result builder.
//!
//! Turns a classified test-point ([`crate::classify::Line::TestPoint`]'s
//! captures) plus the ambient running `count` and active plan window into a
//! complete [`Assertion`] record (spec §4.C).

use crate::directive::{self, Directive};
use crate::event::Assertion;

/// Builds an [`Assertion`] from a classified test-point.
///
/// `rest` is the raw tail captured by the classifier (still carrying an
/// optional leading `- ` separator, which is stripped here before handing
/// the remainder to the directive parser per spec §4.B's note that the
/// directive parser receives the tail "after the leading `-` has been
/// consumed"). `plan` is `Some((start, end))` when a plan window is active.
pub fn build(negated: bool, id: Option<i32>, rest: &str, count: i32, plan: Option<(i32, i32)>) -> Assertion {
    let ok = !negated;
    let id = id.unwrap_or(count + 1);
    let mut assertion = Assertion::new(ok, id);

    let rest = rest
        .strip_prefix('-')
        .map(|s| s.trim_start_matches([' ', '\t']))
        .unwrap_or(rest);
    let (name, directive) = directive::parse(rest);
    if !name.is_empty() {
        assertion.name = Some(name);
    }
    match directive {
        Some(Directive::Todo(reason)) => assertion.todo = Some(reason),
        Some(Directive::Skip(reason)) => assertion.skip = Some(reason),
        Some(Directive::Time(ms)) => assertion.time = Some(ms),
        None => {}
    }

    if let Some((start, end)) = plan {
        if id < start {
            assertion.tap_error = Some("id less than plan start".to_string());
        } else if id > end {
            assertion.tap_error = Some("id greater than plan end".to_string());
        }
    }

    assertion
}
