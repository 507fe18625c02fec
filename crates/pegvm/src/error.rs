//! Error types and the parse-error aggregator.
//!
//! Ordinary match failure is not an error: it is the backtracking return
//! path and only feeds the farthest-failure tracker. Everything that should
//! surface to the caller (callback errors, undefined rules, encoding
//! problems, the synthesised "no match" diagnostic) is appended to an
//! [`ErrorList`], deduplicated by rendered message in first-seen order.

use std::fmt;

use compact_str::CompactString;
use thiserror::Error;

use crate::grammar::CallbackError;
use crate::input::Pos;

/// The closed set of inner error kinds the runtime produces.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("grammar has no rule")]
    NoRule,

    #[error("invalid entrypoint")]
    InvalidEntrypoint,

    #[error("invalid encoding")]
    InvalidEncoding,

    #[error("max number of expressions parsed")]
    MaxExprCnt,

    #[error("undefined rule: {0}")]
    UndefinedRule(CompactString),

    #[error("no match found, expected: {0}")]
    NoMatch(String),

    /// An error returned by (or a panic captured from) a user callback.
    #[error("{0}")]
    Callback(CallbackError),
}

/// One aggregated parse error: an inner kind plus the position and rule
/// context it was recorded under.
///
/// Renders as `"<filename>:<line>:<col> (<offset>): rule <name>: <inner>"`,
/// with the filename and rule parts omitted when absent.
#[derive(Debug, Error)]
#[error("{prefix}: {inner}")]
pub struct ParserError {
    pub(crate) inner: ErrorKind,
    pub(crate) pos: Pos,
    pub(crate) prefix: String,
    pub(crate) expected: Vec<String>,
}

impl ParserError {
    #[must_use]
    pub const fn kind(&self) -> &ErrorKind {
        &self.inner
    }

    #[must_use]
    pub const fn pos(&self) -> Pos {
        self.pos
    }

    #[must_use]
    pub fn expected(&self) -> &[String] {
        &self.expected
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Append-only list of parse errors.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<ParserError>,
}

impl ErrorList {
    pub(crate) fn push(&mut self, err: ParserError) {
        self.errors.push(err);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParserError> {
        self.errors.iter()
    }

    #[must_use]
    pub fn first(&self) -> Option<&ParserError> {
        self.errors.first()
    }

    /// Drop entries whose rendered message duplicates an earlier one,
    /// preserving first-seen order.
    pub fn dedupe(&mut self) {
        let mut seen = hashbrown::HashSet::<String, ahash::RandomState>::default();
        self.errors.retain(|err| seen.insert(err.to_string()));
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a ParserError;
    type IntoIter = std::slice::Iter<'a, ParserError>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Top-level error for the file and reader entry points, which can fail on
/// I/O before parsing starts.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ErrorList),
}

/// Join `list` with `sep`, using `last_sep` before the final element:
/// `["a", "b", "c"]` becomes `a, b or c`.
pub(crate) fn list_join(list: &[String], sep: &str, last_sep: &str) -> String {
    match list {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} {} {}", head.join(sep), last_sep, last),
    }
}
