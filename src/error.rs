use thiserror::Error;

/// Errors that can escape the parser.
///
/// Malformed *TAP* is never an [`Error`]: unrecognised shapes, broken diagnostic
/// blocks, plan mismatches and the like are reified as events or as fields on
/// an assertion record (see [`crate::event::Event`] and
/// [`crate::event::Summary`]). The only way [`Parser::write`](crate::Parser::write)
/// or [`Parser::end`](crate::Parser::end) fail outright is when the bytes handed
/// to them aren't even decodable text, because there is no line to attach a
/// `tapError` to yet.
#[derive(Debug, Error)]
pub enum Error {
    #[error("chunk is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}
