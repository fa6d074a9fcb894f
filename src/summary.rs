//! Component G — the finalizer's plan-validation cascade.
//!
//! [`validate_plan`] is the pure decision table from spec §4.G: given the
//! declared plan window (if any) and what was actually observed, it decides
//! whether the run is consistent and, if not, which `tapError` explains the
//! mismatch. The surrounding drain (flushing `current`, closing an open
//! diagnostic block or child, assembling [`crate::event::Summary`]) needs
//! direct access to the parser's live state and so lives on
//! [`crate::Parser`] itself; this function is kept free-standing because it
//! is the one piece of finalization with no state-machine side effects.

/// The plan window as observed at end-of-stream, or `None` if no plan line
/// was ever seen.
pub struct ObservedPlan {
    pub start: i32,
    pub end: i32,
}

/// Outcome of validating the plan against what was observed.
pub struct Validation {
    /// `Some` iff the run is considered skip-all (a `1..0` plan).
    pub skip_all: bool,
    /// The `tapError` explaining an inconsistency, if any.
    pub tap_error: Option<&'static str>,
}

/// Implements spec §4.G's cascade:
///
/// 1. A `1..0` plan is skip-all; it's only an error if test points were
///    observed anyway.
/// 2. No plan at all is `"no plan"`.
/// 3. A wrong test count is `"incorrect number of tests"`.
/// 4. Otherwise, a `first`/`last` id mismatch against the plan bounds.
pub fn validate_plan(
    plan: Option<ObservedPlan>,
    count: i32,
    first: Option<i32>,
    last: Option<i32>,
) -> Validation {
    let Some(plan) = plan else {
        return Validation {
            skip_all: false,
            tap_error: Some("no plan"),
        };
    };

    if plan.start == 1 && plan.end == 0 {
        return Validation {
            skip_all: true,
            tap_error: if count > 0 {
                Some("Plan of 1..0, but test points encountered")
            } else {
                None
            },
        };
    }

    if count != plan.end - plan.start + 1 {
        return Validation {
            skip_all: false,
            tap_error: Some("incorrect number of tests"),
        };
    }

    if first != Some(plan.start) {
        return Validation {
            skip_all: false,
            tap_error: Some("first test id does not match plan start"),
        };
    }
    if last != Some(plan.end) {
        return Validation {
            skip_all: false,
            tap_error: Some("last test id does not match plan end"),
        };
    }

    Validation {
        skip_all: false,
        tap_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_plan_is_an_error() {
        let v = validate_plan(None, 0, None, None);
        assert!(!v.skip_all);
        assert_eq!(v.tap_error, Some("no plan"));
    }

    #[test]
    fn skip_all_with_no_tests_is_ok() {
        let v = validate_plan(Some(ObservedPlan { start: 1, end: 0 }), 0, None, None);
        assert!(v.skip_all);
        assert_eq!(v.tap_error, None);
    }

    #[test]
    fn skip_all_with_tests_is_an_error() {
        let v = validate_plan(Some(ObservedPlan { start: 1, end: 0 }), 2, Some(1), Some(2));
        assert!(v.skip_all);
        assert_eq!(v.tap_error, Some("Plan of 1..0, but test points encountered"));
    }

    #[test]
    fn wrong_count_is_an_error() {
        let v = validate_plan(Some(ObservedPlan { start: 1, end: 3 }), 2, Some(1), Some(2));
        assert_eq!(v.tap_error, Some("incorrect number of tests"));
    }

    #[test]
    fn mismatched_first_id_is_an_error() {
        let v = validate_plan(Some(ObservedPlan { start: 1, end: 2 }), 2, Some(2), Some(3));
        assert_eq!(v.tap_error, Some("first test id does not match plan start"));
    }

    #[test]
    fn mismatched_last_id_is_an_error() {
        let v = validate_plan(Some(ObservedPlan { start: 1, end: 2 }), 2, Some(1), Some(3));
        assert_eq!(v.tap_error, Some("last test id does not match plan end"));
    }

    #[test]
    fn consistent_plan_has_no_error() {
        let v = validate_plan(Some(ObservedPlan { start: 1, end: 2 }), 2, Some(1), Some(2));
        assert_eq!(v.tap_error, None);
    }
}
