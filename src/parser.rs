//! Component F/G — the main state machine and its end-of-stream finalizer.
//!
//! [`Parser`] is the only stateful type in this crate. Every other module is
//! a pure helper it calls into at the right moment; this file owns the
//! dispatch order from spec §4.F, the child/diagnostic-block interplay from
//! §4.D/§4.E, and the finalization drain from §4.G.

use crate::classify;
use crate::diagnostic::DiagnosticBlock;
use crate::directive::Directive;
use crate::error::Error;
use crate::event::{Assertion, ChildBatch, Event, Plan, PlanSummary, Summary};
use crate::result_builder;
use crate::subtest;
use crate::summary::{self, ObservedPlan};
use crate::yaml;
use std::collections::HashMap;

/// Construction parameters for a [`Parser`] (spec §6 "construction options").
///
/// Root callers leave every field at its default; non-default values are
/// only ever supplied by [`Parser`] itself when it spawns a child (§4.E).
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub indent: String,
    pub level: usize,
    /// Whether this parser is a brace-delimited subtest of its parent's
    /// pending assertion, as opposed to an indented streamed one. The
    /// enclosing assertion record itself lives on the parent; this flag only
    /// ever matters to how the *parent* decides the child has closed.
    pub buffered: bool,
    /// Pre-seeds the `strict` pragma, mirroring a leading `pragma +strict`
    /// line (ambient CLI convenience, not part of any TAP input).
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ChildKind {
    Streamed,
    Buffered,
}

struct ChildState {
    parser: Parser,
    indent: String,
    kind: ChildKind,
}

/// A streaming, single-threaded TAP parser (spec §2 component F/G).
///
/// Feed it bytes with [`write`](Parser::write) as they arrive and finish with
/// [`end`](Parser::end); both return the events produced while handling the
/// given chunk. A subtest is just another `Parser`, owned exclusively by its
/// parent (spec §9 "recursive parser tree").
pub struct Parser {
    indent: String,
    level: usize,
    buffered: bool,

    line_buffer: Vec<u8>,
    bailed_out: Option<String>,

    plan_start: i32,
    plan_end: i32,
    plan_comment: Option<String>,
    post_plan: bool,

    diag: Option<DiagnosticBlock>,
    child: Option<ChildState>,
    current: Option<Assertion>,
    comment_queue: Vec<String>,

    count: i32,
    pass: i32,
    fail: i32,
    todo: i32,
    skip: i32,
    ok: bool,
    first: Option<i32>,
    last: Option<i32>,
    failures: Vec<Assertion>,

    saw_valid_tap: bool,
    strict: bool,
    pragmas: HashMap<String, bool>,

    ended: bool,
}

impl Parser {
    pub fn new(options: Options) -> Self {
        Self {
            indent: options.indent,
            level: options.level,
            buffered: options.buffered,
            line_buffer: Vec::new(),
            bailed_out: None,
            plan_start: -1,
            plan_end: -1,
            plan_comment: None,
            post_plan: false,
            diag: None,
            child: None,
            current: None,
            comment_queue: Vec::new(),
            count: 0,
            pass: 0,
            fail: 0,
            todo: 0,
            skip: 0,
            ok: true,
            first: None,
            last: None,
            failures: Vec::new(),
            saw_valid_tap: false,
            strict: options.strict,
            pragmas: HashMap::new(),
            ended: false,
        }
    }

    /// Whether this instance was spawned as a brace-delimited subtest.
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Appends `chunk`, parsing every complete line it makes available.
    ///
    /// Returns `Err` only when `chunk` is not valid UTF-8 — the one failure
    /// mode that can't be reified as an event, since there's no line yet to
    /// attach anything to (spec §7, §4.H).
    pub fn write(&mut self, chunk: &[u8]) -> Result<Vec<Event>, Error> {
        if self.bailed_out.is_some() || self.ended {
            return Ok(Vec::new());
        }
        let text = std::str::from_utf8(chunk)?;
        self.line_buffer.extend_from_slice(text.as_bytes());
        Ok(self.drain_complete_lines())
    }

    /// Feeds an optional final chunk, flushes any residual partial line, and
    /// runs the end-of-stream finalizer (spec §4.G). Idempotent in the sense
    /// that calling it again after it has run produces only an empty result.
    pub fn end(&mut self, chunk: Option<&[u8]>) -> Result<Vec<Event>, Error> {
        if self.ended {
            return Ok(Vec::new());
        }
        let mut events = Vec::new();
        if let Some(c) = chunk {
            events.extend(self.write(c)?);
        }
        if self.bailed_out.is_none() && !self.line_buffer.is_empty() {
            self.line_buffer.push(b'\n');
            events.extend(self.drain_complete_lines());
        }
        events.extend(self.finalize());
        self.ended = true;
        Ok(events)
    }

    fn drain_complete_lines(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            let Some(pos) = self.line_buffer.iter().position(|&b| b == b'\n') else {
                break;
            };
            let raw: Vec<u8> = self.line_buffer.drain(..=pos).collect();
            // Splitting only ever happens at an ASCII '\n', always a char
            // boundary, so every fragment we split off is itself valid UTF-8
            // as long as each `write` call was handed self-contained UTF-8.
            let line = String::from_utf8(raw).expect("line split only ever occurs at ASCII '\\n'");
            events.extend(self.ingest_line(&line));
            if self.bailed_out.is_some() {
                // Per invariant 5, drop everything still buffered; no more
                // lines are dispatched, but keep draining bytes silently so
                // `line_buffer` doesn't grow unbounded on a long tail.
                self.line_buffer.clear();
                break;
            }
        }
        events
    }

    fn ingest_line(&mut self, raw: &str) -> Vec<Event> {
        if self.bailed_out.is_some() {
            return Vec::new();
        }
        let line = normalize_crlf(raw);
        let mut events = vec![Event::Line(line.clone())];
        events.extend(self.dispatch(&line));
        events
    }

    fn dispatch(&mut self, line: &str) -> Vec<Event> {
        let body = line.strip_suffix('\n').unwrap_or(line);

        if body.is_empty() {
            return self.dispatch_blank();
        }

        if let Some(mut child) = self.child.take() {
            if body.starts_with(child.indent.as_str()) {
                let stripped = &body[child.indent.len()..];
                let forwarded = format!("{stripped}\n");
                let child_events = child.parser.ingest_line(&forwarded);
                let mut events = self.observe_child_events(&child_events);
                events.insert(
                    0,
                    Event::Child(ChildBatch {
                        indent: child.indent.clone(),
                        level: child.parser.level,
                        events: child_events,
                    }),
                );
                self.child = Some(child);
                return events;
            }
            match child.kind {
                ChildKind::Streamed => {
                    let mut events = self.finish_child(child);
                    events.extend(self.dispatch(line));
                    return events;
                }
                ChildKind::Buffered => {
                    // Stays open; only an exact unindented "}" closes it.
                    self.child = Some(child);
                }
            }
        }

        if let Some(mut diag) = self.diag.take() {
            if diag.extends(body) {
                if diag.is_closing(body) {
                    return self.close_diagnostic(diag);
                }
                diag.push(body);
                self.diag = Some(diag);
                return Vec::new();
            }
            let mut garbage = diag.reassemble();
            garbage.push_str(line);
            let mut events = self.emit_extra_text(garbage);
            events.extend(self.dispatch(line));
            return events;
        }

        let (indent, content) = subtest::split_indent(body);
        if !indent.is_empty() {
            return self.dispatch_indented(indent, content, body, line);
        }

        self.dispatch_unindented(body, line)
    }

    fn dispatch_blank(&mut self) -> Vec<Event> {
        if let Some(mut child) = self.child.take() {
            let child_events = child.parser.ingest_line("\n");
            let mut events = self.observe_child_events(&child_events);
            events.insert(
                0,
                Event::Child(ChildBatch {
                    indent: child.indent.clone(),
                    level: child.parser.level,
                    events: child_events,
                }),
            );
            self.child = Some(child);
            return events;
        }
        if let Some(diag) = &mut self.diag {
            diag.push("");
        }
        Vec::new()
    }

    fn dispatch_indented(&mut self, indent: &str, content: &str, _body: &str, line: &str) -> Vec<Event> {
        // An already-open child (most notably a buffered subtest that stays
        // open across lines not matching its own indent, per `dispatch`)
        // must never be clobbered by a second spawn here, and a diagnostic
        // block can't coexist with one either (invariant 4). A line that
        // reaches this point while `self.child` is still set belongs to
        // neither and falls straight through to `emit_extra` below.
        if self.child.is_none() {
            if let Some(current) = &self.current {
                if let Some(name) = current.name.as_deref() {
                    if subtest::strip_buffered_marker(name).is_some() {
                        return self.spawn_child(indent, content, ChildKind::Buffered);
                    }
                }
            }

            if self.current.is_some() && content == "---" {
                tracing::trace!(%indent, "opening diagnostic block");
                self.diag = Some(DiagnosticBlock::new(indent.to_string()));
                return Vec::new();
            }

            if !self.post_plan {
                let probe = format!("{content}\n");
                if subtest::looks_like_top_level_shape(&probe) {
                    return self.spawn_child(indent, content, ChildKind::Streamed);
                }
            }
        }

        self.emit_extra(line)
    }

    fn dispatch_unindented(&mut self, body: &str, line: &str) -> Vec<Event> {
        if let Some(rest) = body.strip_prefix('#') {
            let _ = rest;
            return self.queue_or_emit_comment(line.to_string());
        }

        if self.post_plan {
            return self.emit_extra(line);
        }

        if let Some(reason) = classify::classify_bail_out(body) {
            return self.handle_bailout(reason.map(str::to_string));
        }
        if let Some((enabled, name)) = classify::classify_pragma(body) {
            return self.handle_pragma(enabled, name.to_string(), line);
        }
        if let Some(version) = classify::classify_version(body) {
            return self.handle_version(version, line);
        }
        if let Some((start, end, comment)) = classify::classify_plan(body) {
            return self.handle_plan(start, end, comment.map(str::to_string), line);
        }
        if body.trim_end() == "}" {
            if let Some(child) = self.child.take() {
                if child.kind == ChildKind::Buffered {
                    return self.finish_child(child);
                }
                self.child = Some(child);
            }
        }
        if let Some((negated, id, rest)) = classify::classify_test_point(body) {
            return self.handle_test_point(negated, id, rest.to_string());
        }

        self.emit_extra(line)
    }

    fn spawn_child(&mut self, indent: &str, content: &str, kind: ChildKind) -> Vec<Event> {
        let indent = indent.to_string();
        let level = self.level + 1;
        tracing::trace!(parent_level = self.level, level, kind = ?kind, %indent, "spawning child parser");
        let mut child_parser = Parser::new(Options {
            indent: indent.clone(),
            level,
            buffered: kind == ChildKind::Buffered,
            strict: self.strict,
        });
        let forwarded = format!("{content}\n");
        let child_events = child_parser.ingest_line(&forwarded);
        let mut events = self.observe_child_events(&child_events);
        events.insert(
            0,
            Event::Child(ChildBatch {
                indent: indent.clone(),
                level,
                events: child_events,
            }),
        );
        self.child = Some(ChildState {
            parser: child_parser,
            indent,
            kind,
        });
        events
    }

    /// Scans a just-forwarded child's events for a bailout and propagates it
    /// synchronously to `self` (spec §4.E "a child's bailout propagates").
    fn observe_child_events(&mut self, events: &[Event]) -> Vec<Event> {
        let mut propagated = Vec::new();
        for event in events {
            if let Event::Bailout(reason) = event {
                if self.bailed_out.is_none() {
                    self.bailed_out = Some(reason.clone());
                    self.ok = false;
                    propagated.push(Event::Bailout(reason.clone()));
                }
            }
        }
        propagated
    }

    /// Closes `child` (streamed dedent, or the literal `}` for a buffered
    /// one) and, for a buffered child, flushes the enclosing assertion.
    fn finish_child(&mut self, child: ChildState) -> Vec<Event> {
        let ChildState {
            mut parser,
            indent,
            kind,
        } = child;
        tracing::trace!(level = parser.level, kind = ?kind, %indent, "closing child parser");
        let complete_events = parser.end(None).expect("closing a child cannot fail: no new bytes are given");
        for event in &complete_events {
            if let Event::Complete(summary) = event {
                if !summary.ok && self.saw_valid_tap {
                    self.ok = false;
                }
            }
        }
        let mut events = vec![Event::Child(ChildBatch {
            indent,
            level: parser.level,
            events: complete_events,
        })];

        if kind == ChildKind::Buffered {
            if let Some(current) = &mut self.current {
                if let Some(name) = current.name.take() {
                    let trimmed = subtest::strip_buffered_marker(&name).unwrap_or(&name).trim().to_string();
                    current.name = if trimmed.is_empty() { None } else { Some(trimmed) };
                }
            }
            events.extend(self.flush_current());
        }
        events
    }

    fn close_diagnostic(&mut self, diag: DiagnosticBlock) -> Vec<Event> {
        match yaml::load_yaml(diag.text()) {
            Ok(doc) => {
                tracing::debug!(indent = %diag.indent, "diagnostic block parsed as yaml");
                if let Some(current) = &mut self.current {
                    current.diag = Some(doc);
                }
                self.flush_current()
            }
            Err(error) => {
                tracing::debug!(indent = %diag.indent, %error, "diagnostic block failed to parse as yaml, emitting as extra");
                self.emit_extra_text(diag.reassemble())
            }
        }
    }

    fn queue_or_emit_comment(&mut self, text: String) -> Vec<Event> {
        if self.current.is_some() || !self.comment_queue.is_empty() {
            self.comment_queue.push(text);
            Vec::new()
        } else {
            vec![Event::Comment(text)]
        }
    }

    fn handle_bailout(&mut self, reason: Option<String>) -> Vec<Event> {
        let mut events = self.flush_current();
        let reason = reason.unwrap_or_default();
        self.bailed_out = Some(reason.clone());
        self.ok = false;
        events.push(Event::Bailout(reason));
        events
    }

    fn handle_pragma(&mut self, enabled: bool, name: String, line: &str) -> Vec<Event> {
        if self.child.is_some() {
            return self.emit_extra(line);
        }
        if name == "strict" {
            self.strict = enabled;
        }
        self.pragmas.insert(name, enabled);
        Vec::new()
    }

    fn handle_version(&mut self, version: u32, line: &str) -> Vec<Event> {
        if version < 13 || self.plan_start != -1 || self.count != 0 {
            return self.emit_extra(line);
        }
        self.saw_valid_tap = true;
        vec![Event::Version(version)]
    }

    fn handle_plan(&mut self, start: i32, end: i32, comment: Option<String>, line: &str) -> Vec<Event> {
        if self.plan_start != -1 || self.child.is_some() {
            return self.emit_extra(line);
        }
        let mut events = self.flush_current();
        self.plan_start = start;
        self.plan_end = end;
        self.plan_comment = comment.clone();
        self.saw_valid_tap = true;
        events.push(Event::Plan(Plan { start, end, comment }));
        self.post_plan = self.count > 0 || end == 0;
        events
    }

    fn handle_test_point(&mut self, negated: bool, id: Option<i32>, rest: String) -> Vec<Event> {
        let mut events = self.flush_current();
        let plan_window = if self.plan_start != -1 {
            Some((self.plan_start, self.plan_end))
        } else {
            None
        };
        let assertion = result_builder::build(negated, id, &rest, self.count, plan_window);
        self.saw_valid_tap = true;
        self.first = Some(self.first.map_or(assertion.id, |f| f.min(assertion.id)));
        self.last = Some(self.last.map_or(assertion.id, |l| l.max(assertion.id)));
        self.current = Some(assertion);
        events
    }

    /// Closes any open child, drops any still-open diagnostic block, and — if
    /// `current` is set — tallies it, emits `assert`, then drains queued
    /// comments (spec §4.F "Flush").
    fn flush_current(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if let Some(child) = self.child.take() {
            events.extend(self.finish_child(child));
        }
        self.diag = None;

        if let Some(assertion) = self.current.take() {
            self.count += 1;
            if assertion.ok {
                self.pass += 1;
            } else {
                self.fail += 1;
            }
            if assertion.todo.is_some() {
                self.todo += 1;
            }
            if assertion.skip.is_some() {
                self.skip += 1;
            }
            let is_plain_failure = !assertion.ok && !assertion.is_todo_or_skip();
            let registers_failure = is_plain_failure || assertion.tap_error.is_some();
            if !assertion.ok || registers_failure {
                self.ok = false;
            }
            if registers_failure {
                self.failures.push(assertion.clone());
            }
            events.push(Event::Assert(assertion));
            events.extend(self.comment_queue.drain(..).map(Event::Comment));
        }
        events
    }

    fn emit_extra(&mut self, line: &str) -> Vec<Event> {
        self.emit_extra_text(line.to_string())
    }

    fn emit_extra_text(&mut self, text: String) -> Vec<Event> {
        if self.strict {
            let mut failure = Assertion::new(false, -1);
            failure.tap_error = Some("Non-TAP data encountered in strict mode".to_string());
            failure.name = Some(text.clone());
            self.failures.push(failure);
            self.ok = false;
        }
        vec![Event::Extra(text)]
    }

    fn finalize(&mut self) -> Vec<Event> {
        let mut events = Vec::new();

        if self.bailed_out.is_none() {
            if let Some(diag) = self.diag.take() {
                events.extend(self.emit_extra_text(diag.reassemble()));
            }
            events.extend(self.flush_current());
        }

        // A bailout aborts the run deliberately; the plan-consistency
        // cascade only judges a stream that ran to its natural end (spec
        // §4.G runs after "if residual buffered bytes remain..."  with no
        // mention of bailout, and S4 expects no extra tapError beyond the
        // bailout itself).
        let validation = if self.bailed_out.is_none() {
            let observed_plan = if self.plan_start != -1 {
                Some(ObservedPlan {
                    start: self.plan_start,
                    end: self.plan_end,
                })
            } else {
                None
            };
            let validation = summary::validate_plan(observed_plan, self.count, self.first, self.last);
            if let Some(tap_error) = validation.tap_error {
                self.ok = false;
                let mut synthetic = Assertion::new(false, -1);
                synthetic.tap_error = Some(tap_error.to_string());
                self.failures.push(synthetic);
            }
            validation
        } else {
            self.ok = false;
            summary::Validation {
                skip_all: false,
                tap_error: None,
            }
        };

        let plan = if self.plan_start != -1 {
            Some(PlanSummary {
                start: self.plan_start,
                end: self.plan_end,
                skip_all: if validation.skip_all { Some(true) } else { None },
                skip_reason: if validation.skip_all {
                    self.plan_comment.clone()
                } else {
                    None
                },
            })
        } else {
            None
        };

        let summary = if !self.saw_valid_tap && self.bailed_out.is_none() {
            Summary {
                ok: true,
                count: 0,
                pass: 0,
                fail: None,
                bailout: None,
                todo: None,
                skip: None,
                plan: Some(PlanSummary {
                    start: 1,
                    end: 0,
                    skip_all: None,
                    skip_reason: None,
                }),
                failures: Vec::new(),
            }
        } else {
            Summary {
                ok: self.ok,
                count: self.count,
                pass: self.pass,
                fail: if self.fail > 0 { Some(self.fail) } else { None },
                bailout: self.bailed_out.clone(),
                todo: if self.todo > 0 { Some(self.todo) } else { None },
                skip: if self.skip > 0 { Some(self.skip) } else { None },
                plan,
                failures: self.failures.clone(),
            }
        };

        events.push(Event::Complete(summary));
        events
    }
}

/// Normalizes a single `\r\n`-or-`\n`-terminated line to `\n`.
fn normalize_crlf(line: &str) -> String {
    if let Some(stripped) = line.strip_suffix("\r\n") {
        format!("{stripped}\n")
    } else {
        line.to_string()
    }
}

/// Callback-style alternative to collecting [`Parser`]'s returned `Vec<Event>`
/// (spec §6 ambient addition). Sugar only: it does not change the
/// synchronous, single-threaded contract of `write`/`end`.
pub trait EventSink {
    fn on_event(&mut self, event: &Event);
}

impl<F: FnMut(&Event)> EventSink for F {
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}

/// Runs `events` (and, recursively, any nested [`Event::Child`] batches)
/// through `sink` in emission order.
pub fn for_each_event(events: &[Event], sink: &mut impl EventSink) {
    for event in events {
        if let Event::Child(batch) = event {
            for_each_event(&batch.events, sink);
        }
        sink.on_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Reason;
    use pretty_assertions::assert_eq;

    fn parse_all(input: &str) -> Vec<Event> {
        let mut parser = Parser::new(Options::default());
        let mut events = parser.write(input.as_bytes()).expect("valid utf8");
        events.extend(parser.end(None).expect("valid utf8"));
        events
    }

    fn complete_summary(events: &[Event]) -> &Summary {
        match events.last() {
            Some(Event::Complete(summary)) => summary,
            other => panic!("expected a trailing complete event, got {other:?}"),
        }
    }

    #[test]
    fn s1_minimal_passing() {
        let events = parse_all("TAP version 13\n1..1\nok 1 - hello\n");
        assert_eq!(events[0], Event::Line("TAP version 13\n".to_string()));
        assert_eq!(events[1], Event::Version(13));
        assert_eq!(events[3], Event::Plan(Plan { start: 1, end: 1, comment: None }));
        let mut expected = Assertion::new(true, 1);
        expected.name = Some("hello".to_string());
        assert_eq!(events[5], Event::Assert(expected));
        let summary = complete_summary(&events);
        assert!(summary.ok);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.pass, 1);
        assert_eq!(summary.plan.as_ref().unwrap().start, 1);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn s2_failure_with_diagnostic() {
        let events = parse_all("1..1\nnot ok 1 - boom\n  ---\n  got: 1\n  want: 2\n  ...\n");
        let assert_event = events.iter().find_map(|e| match e {
            Event::Assert(a) => Some(a),
            _ => None,
        });
        let assertion = assert_event.expect("an assert event");
        assert!(!assertion.ok);
        assert_eq!(assertion.name.as_deref(), Some("boom"));
        let diag = assertion.diag.as_ref().expect("attached diagnostic");
        assert_eq!(diag["got"].as_i64(), Some(1));
        assert_eq!(diag["want"].as_i64(), Some(2));

        let summary = complete_summary(&events);
        assert!(!summary.ok);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.fail, Some(1));
        assert_eq!(summary.failures.len(), 1);
    }

    #[test]
    fn s3_skip_all() {
        let events = parse_all("1..0 # nothing to do\n");
        assert!(events.iter().any(|e| matches!(e, Event::Plan(p) if p.start == 1 && p.end == 0)));
        let summary = complete_summary(&events);
        assert!(summary.ok);
        assert_eq!(summary.count, 0);
        let plan = summary.plan.as_ref().expect("plan present");
        assert_eq!(plan.skip_all, Some(true));
        assert_eq!(plan.skip_reason.as_deref(), Some("nothing to do"));
    }

    #[test]
    fn s4_bailout_mid_stream() {
        let events = parse_all("1..3\nok 1\nBail out! kaboom\nok 2\n");
        assert!(events.iter().any(|e| matches!(e, Event::Bailout(reason) if reason == "kaboom")));
        let summary = complete_summary(&events);
        assert!(!summary.ok);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.pass, 1);
        assert_eq!(summary.bailout.as_deref(), Some("kaboom"));
        // The text of "ok 2" is never even seen as a raw line event, since
        // ingest drops everything once bailed_out is set.
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::Line(l) if l.contains("ok 2"))));
    }

    #[test]
    fn s5_streamed_child() {
        let events = parse_all("1..1\n    1..1\n    ok 1 - inner\nok 1 - outer\n");
        let child_batches: Vec<&ChildBatch> = events
            .iter()
            .filter_map(|e| match e {
                Event::Child(batch) => Some(batch),
                _ => None,
            })
            .collect();
        assert!(!child_batches.is_empty());
        assert_eq!(child_batches[0].indent, "    ");

        let inner_events: Vec<&Event> = child_batches.iter().flat_map(|b| b.events.iter()).collect();
        assert!(inner_events
            .iter()
            .any(|e| matches!(e, Event::Plan(p) if p.start == 1 && p.end == 1)));
        assert!(inner_events.iter().any(|e| matches!(e, Event::Assert(a) if a.name.as_deref() == Some("inner"))));
        assert!(inner_events.iter().any(|e| matches!(e, Event::Complete(_))));

        let outer_assert = events.iter().find_map(|e| match e {
            Event::Assert(a) if a.name.as_deref() == Some("outer") => Some(a),
            _ => None,
        });
        assert!(outer_assert.is_some());

        let summary = complete_summary(&events);
        assert!(summary.ok);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.pass, 1);
    }

    #[test]
    fn s6_plan_count_mismatch() {
        let events = parse_all("1..3\nok 1\nok 2\n");
        let summary = complete_summary(&events);
        assert!(!summary.ok);
        assert!(summary
            .failures
            .iter()
            .any(|f| f.tap_error.as_deref() == Some("incorrect number of tests")));
    }

    #[test]
    fn empty_input_is_an_empty_passing_run() {
        let events = parse_all("");
        let summary = complete_summary(&events);
        assert!(summary.ok);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.plan.as_ref().unwrap().start, 1);
        assert_eq!(summary.plan.as_ref().unwrap().end, 0);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn console_log_only_input_is_treated_as_empty_passing() {
        let events = parse_all("just some console output\nand more\n");
        assert_eq!(events.iter().filter(|e| matches!(e, Event::Extra(_))).count(), 2);
        let summary = complete_summary(&events);
        assert!(summary.ok);
        assert_eq!(summary.count, 0);
    }

    #[test]
    fn buffered_subtest_closes_on_brace() {
        let events = parse_all("1..1\nok 1 - outer {\n    ok 1 - inner\n}\n");
        let outer = events.iter().find_map(|e| match e {
            Event::Assert(a) if a.name.as_deref() == Some("outer") => Some(a),
            _ => None,
        });
        assert!(outer.is_some(), "buffered subtest's enclosing assertion should flush on '}}'");
        let summary = complete_summary(&events);
        assert!(summary.ok);
    }

    #[test]
    fn buffered_child_is_not_replaced_by_a_mismatched_indent_line() {
        // The "  garbage" line is indented less than the child's own
        // established "    " indent, so it can't be forwarded to it; the
        // buffered marker on the still-pending "outer {" assertion must not
        // cause a *second* buffered child to be spawned over the first one.
        let events = parse_all("1..1\nok 1 - outer {\n    ok 1 - inner\n  garbage\n}\n");

        let child_batches: Vec<&ChildBatch> = events
            .iter()
            .filter_map(|e| match e {
                Event::Child(batch) => Some(batch),
                _ => None,
            })
            .collect();
        // One batch forwards "ok 1 - inner", one closes the child on "}";
        // both must share the indent established by the first forwarded
        // line, proving no replacement child with a different indent ever
        // existed.
        assert_eq!(child_batches.len(), 2);
        assert!(child_batches.iter().all(|b| b.indent == "    "));

        let inner_completions = child_batches
            .iter()
            .flat_map(|b| b.events.iter())
            .filter(|e| matches!(e, Event::Complete(_)))
            .count();
        assert_eq!(inner_completions, 1, "the original child must finalize exactly once, not get silently discarded");

        let inner_assert = child_batches
            .iter()
            .flat_map(|b| b.events.iter())
            .find_map(|e| match e {
                Event::Assert(a) if a.name.as_deref() == Some("inner") => Some(a),
                _ => None,
            });
        assert!(inner_assert.is_some(), "the original child's pending assertion must survive to flush");

        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Extra(text) if text.contains("garbage"))));

        let outer = events.iter().find_map(|e| match e {
            Event::Assert(a) if a.name.as_deref() == Some("outer") => Some(a),
            _ => None,
        });
        assert!(outer.is_some());
    }

    #[test]
    fn comments_emit_after_their_preceding_assertion() {
        let events = parse_all("1..1\nok 1 - hello\n# a trailing comment\n");
        let assert_pos = events.iter().position(|e| matches!(e, Event::Assert(_))).unwrap();
        let comment_pos = events.iter().position(|e| matches!(e, Event::Comment(_))).unwrap();
        assert!(comment_pos > assert_pos);
    }

    #[test]
    fn todo_directive_is_preserved_through_flush() {
        let events = parse_all("1..1\nnot ok 1 - flaky # TODO revisit\n");
        let assertion = events
            .iter()
            .find_map(|e| match e {
                Event::Assert(a) => Some(a),
                _ => None,
            })
            .unwrap();
        assert_eq!(assertion.todo, Some(Reason::text("revisit")));
        let summary = complete_summary(&events);
        // A todo'd failure is not added to `failures`, but it does still
        // count as a `fail` (see spec §4.F/§8's "fail > 0 => ok == false").
        assert!(summary.failures.is_empty());
        assert!(!summary.ok);
    }

    #[test]
    fn strict_mode_upgrades_extra_to_a_failure() {
        let mut parser = Parser::new(Options {
            strict: true,
            ..Options::default()
        });
        let mut events = parser.write(b"not tap at all\n").unwrap();
        events.extend(parser.end(None).unwrap());
        let summary = complete_summary(&events);
        assert!(!summary.ok);
        assert!(summary
            .failures
            .iter()
            .any(|f| f.tap_error.as_deref() == Some("Non-TAP data encountered in strict mode")));
    }

    /// Independent reference flattening to check [`for_each_event`] against,
    /// so a regression in its recursion (wrong order, dropped nested
    /// batches) shows up as a mismatch rather than needing to be spotted by
    /// eye.
    fn reference_flatten(events: &[Event]) -> Vec<Event> {
        let mut out = Vec::new();
        for event in events {
            if let Event::Child(batch) = event {
                out.extend(reference_flatten(&batch.events));
            }
            out.push(event.clone());
        }
        out
    }

    #[test]
    fn for_each_event_matches_reference_flatten_of_a_nested_child() {
        let events = parse_all("1..1\n    1..1\n    ok 1 - inner\nok 1 - outer\n");

        let mut flattened = Vec::new();
        for_each_event(&events, &mut |event: &Event| flattened.push(event.clone()));

        assert_eq!(flattened, reference_flatten(&events));
        // Sanity: the child's nested events really did get surfaced, not
        // just passed through unchanged.
        assert!(flattened.len() > events.len());
        assert!(flattened
            .iter()
            .any(|e| matches!(e, Event::Assert(a) if a.name.as_deref() == Some("inner"))));
    }

    #[test]
    fn for_each_event_visits_every_event_once_with_no_nesting() {
        let events = parse_all("1..1\nok 1 - hello\n");
        assert!(!events.iter().any(|e| matches!(e, Event::Child(_))));

        let mut flattened = Vec::new();
        for_each_event(&events, &mut |event: &Event| flattened.push(event.clone()));
        assert_eq!(flattened, events);
    }

    #[test]
    fn for_each_event_on_empty_input_visits_nothing() {
        let mut flattened: Vec<Event> = Vec::new();
        for_each_event(&[], &mut |event: &Event| flattened.push(event.clone()));
        assert!(flattened.is_empty());
    }
}
