//! Event payloads published by [`crate::Parser`].
//!
//! Every shape in this module mirrors a row of the parser's event table:
//! [`Event::Line`], [`Event::Version`], [`Event::Plan`], [`Event::Assert`],
//! [`Event::Comment`], [`Event::Extra`], [`Event::Child`], [`Event::Bailout`]
//! and [`Event::Complete`] are the only events a caller ever observes.

use serde::Serialize;

/// A parsed plan declaration, as announced by the `plan` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub start: i32,
    pub end: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// The plan as recorded in the final [`Summary`], including the skip-all
/// verdict the finalizer derives from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub start: i32,
    pub end: i32,
    #[serde(rename = "skipAll", skip_serializing_if = "Option::is_none")]
    pub skip_all: Option<bool>,
    #[serde(rename = "skipReason", skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

/// A `todo`/`skip` directive's reason: either a free-text reason or a bare
/// flag when no reason followed the keyword (`ok # TODO` with nothing after).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reason {
    Text(String),
    Flag(bool),
}

impl Reason {
    pub fn present() -> Self {
        Reason::Flag(true)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Reason::Text(s.into())
    }
}

/// A single test-point result.
///
/// `diag` holds whatever [`crate::yaml::load_yaml`] returned for the
/// attached diagnostic block, if any; `tap_error` is set when this assertion
/// violates the active plan window (spec §4.C) and is, in that case, also
/// present in [`Summary::failures`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assertion {
    pub ok: bool,
    pub id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo: Option<Reason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<Reason>,
    /// Duration in milliseconds, derived from a trailing `time=Nms`/`time=Ns`
    /// directive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diag: Option<serde_yaml::Value>,
    #[serde(rename = "tapError", skip_serializing_if = "Option::is_none")]
    pub tap_error: Option<String>,
}

impl Assertion {
    pub(crate) fn new(ok: bool, id: i32) -> Self {
        Self {
            ok,
            id,
            name: None,
            todo: None,
            skip: None,
            time: None,
            diag: None,
            tap_error: None,
        }
    }

    pub(crate) fn is_todo_or_skip(&self) -> bool {
        self.todo.is_some() || self.skip.is_some()
    }
}

/// The final, once-per-run summary emitted as [`Event::Complete`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub ok: bool,
    pub count: i32,
    pub pass: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bailout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanSummary>,
    pub failures: Vec<Assertion>,
}

/// The bundle of events a child (subtest) parser produced while handling one
/// forwarded line.
///
/// The parser tree is owned top-down (spec §9 "recursive parser tree"), so
/// rather than handing callers a live reference into a child they don't own,
/// each `child` event simply carries that child's own events for the line
/// that was just forwarded to it. A caller that wants the full nested stream
/// recurses into `events` the same way the parser itself recurses into
/// `ingest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildBatch {
    pub indent: String,
    pub level: usize,
    pub events: Vec<Event>,
}

/// Everything [`crate::Parser`] can publish.
///
/// Note that a recognised `pragma` line updates the parser's internal
/// `strict`/pragma-map state (spec §4.F "Pragma handling") but — per the
/// event table in spec §6 — does not itself publish an event; it is visible
/// only through its effect on later `extra` events (strict-mode upgrade) or
/// on [`Summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Event {
    Line(String),
    Version(u32),
    Plan(Plan),
    Assert(Assertion),
    Comment(String),
    Extra(String),
    Child(ChildBatch),
    Bailout(String),
    Complete(Summary),
}
