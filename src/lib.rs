//! A streaming parser for the Test Anything Protocol (TAP).
//!
//! Feed bytes to a [`Parser`] as they arrive with [`Parser::write`], finish
//! with [`Parser::end`], and collect the [`Event`]s each call returns. The
//! parser never blocks and never buffers more than the current partial line
//! plus whatever pending assertion/diagnostic/child state the protocol
//! itself requires (see the module docs on [`parser`] for the state
//! machine's dispatch order).
//!
//! ```
//! use tapstream::{Options, Parser};
//!
//! let mut parser = Parser::new(Options::default());
//! let mut events = parser.write(b"1..1\nok 1 - it works\n").unwrap();
//! events.extend(parser.end(None).unwrap());
//! assert!(events.iter().any(|e| matches!(e, tapstream::Event::Complete(s) if s.ok)));
//! ```

mod classify;
mod diagnostic;
mod directive;
mod error;
mod event;
mod parser;
mod result_builder;
mod subtest;
mod summary;
mod yaml;

pub use error::Error;
pub use event::{Assertion, ChildBatch, Event, Plan, PlanSummary, Reason, Summary};
pub use parser::{for_each_event, EventSink, Options, Parser};
pub use yaml::load_yaml;
