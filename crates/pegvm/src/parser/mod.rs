//! The parser: entry points, rule dispatch and error aggregation.
//!
//! A [`Parser`] owns all mutable state of one parse (cursor, variable and
//! recovery stacks, failure tracker, error list, statistics) and borrows
//! the grammar and input. A parser instance performs a single parse; build
//! a fresh one per input.

pub mod context;
mod engine;
mod options;
mod state;
mod stats;

pub use context::{MatchContext, StoreDict};
pub use options::ParseOption;
pub use state::VarFrame;
pub use stats::Stats;

use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::error::{list_join, Error, ErrorKind, ErrorList, ParserError};
use crate::grammar::{Grammar, Rule};
use crate::input::{Cursor, Pos};
use crate::value::Value;

use engine::Fatal;
use state::{FailureTracker, RecoveryStack, VarStack};

/// Parse `input` against `grammar`, with `filename` used in error messages.
///
/// Returns the entrypoint rule's value on success. Any recorded error,
/// including a callback error on an otherwise successful match, yields the
/// deduplicated error list instead.
pub fn parse(
    filename: &str,
    input: &[u8],
    grammar: &Grammar,
    options: impl IntoIterator<Item = ParseOption>,
) -> Result<Value, ErrorList> {
    let mut parser = Parser::new(filename, input, grammar);
    parser.set_options(options);
    parser.parse()
}

/// Read `reader` to the end, then [`parse`] the buffered bytes.
pub fn parse_reader(
    filename: &str,
    mut reader: impl Read,
    grammar: &Grammar,
    options: impl IntoIterator<Item = ParseOption>,
) -> Result<Value, Error> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    parse(filename, &data, grammar, options).map_err(Error::from)
}

/// Read the file at `path`, then [`parse`] its contents.
pub fn parse_file(
    path: impl AsRef<Path>,
    grammar: &Grammar,
    options: impl IntoIterator<Item = ParseOption>,
) -> Result<Value, Error> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    parse(&path.display().to_string(), &data, grammar, options).map_err(Error::from)
}

/// State of one parse. See the module docs; most callers use the free
/// functions and never touch this directly.
#[derive(Debug)]
pub struct Parser<'g, 'i> {
    pub(crate) filename: String,
    pub(crate) cursor: Cursor<'i>,
    pub(crate) grammar: &'g Grammar,
    pub(crate) rules: HashMap<&'g str, &'g Rule, ahash::RandomState>,
    pub(crate) errs: ErrorList,
    pub(crate) vstack: VarStack,
    pub(crate) rstack: Vec<&'g Rule>,
    pub(crate) recovery: RecoveryStack<'g>,
    pub(crate) fail: FailureTracker,
    pub(crate) max_expr_cnt: u64,
    pub(crate) entrypoint: CompactString,
    pub(crate) recover_panics: bool,
    pub(crate) debug: bool,
    pub(crate) store: StoreDict,
    pub(crate) stats: Stats,
    pub(crate) choice_no_match: CompactString,
}

impl<'g, 'i> Parser<'g, 'i> {
    #[must_use]
    pub fn new(filename: &str, input: &'i [u8], grammar: &'g Grammar) -> Self {
        Self {
            filename: filename.to_owned(),
            cursor: Cursor::new(input),
            grammar,
            rules: HashMap::default(),
            errs: ErrorList::default(),
            vstack: VarStack::default(),
            rstack: Vec::new(),
            recovery: RecoveryStack::default(),
            fail: FailureTracker::new(),
            max_expr_cnt: 0,
            entrypoint: grammar
                .rules()
                .first()
                .map(|r| CompactString::new(r.name()))
                .unwrap_or_default(),
            recover_panics: true,
            debug: false,
            store: StoreDict::default(),
            stats: Stats::default(),
            choice_no_match: CompactString::default(),
        }
    }

    pub fn set_options(&mut self, options: impl IntoIterator<Item = ParseOption>) {
        for option in options {
            option.apply(self);
        }
    }

    pub(crate) fn set_entrypoint(&mut self, name: &str) {
        if name.is_empty() {
            self.entrypoint = self
                .grammar
                .rules()
                .first()
                .map(|r| CompactString::new(r.name()))
                .unwrap_or_default();
        } else {
            self.entrypoint = CompactString::new(name);
        }
    }

    /// Statistics of the parse so far.
    #[must_use]
    pub const fn stats(&self) -> &Stats {
        &self.stats
    }

    /// The persistent global store.
    #[must_use]
    pub const fn store(&self) -> &StoreDict {
        &self.store
    }

    /// Run the parse. Consumes the accumulated error state; a parser is
    /// not reusable after this returns.
    pub fn parse(&mut self) -> Result<Value, ErrorList> {
        if self.grammar.is_empty() {
            self.add_err(ErrorKind::NoRule);
            return Err(self.take_errs());
        }
        self.build_rules_table();

        let start_rule = self.rules.get(self.entrypoint.as_str()).copied();
        let Some(start_rule) = start_rule else {
            self.add_err(ErrorKind::InvalidEntrypoint);
            return Err(self.take_errs());
        };

        // advance to the first rune
        self.read_rune();

        let val = match self.parse_rule(start_rule) {
            Ok(val) => val,
            Err(Fatal::MaxExprCnt) => {
                self.add_err(ErrorKind::MaxExprCnt);
                None
            }
            Err(Fatal::Panic(message)) => {
                self.add_err(ErrorKind::Callback(message.into()));
                None
            }
        };

        if val.is_none() && self.errs.is_empty() {
            self.report_no_match(start_rule);
        }

        if self.errs.is_empty() {
            // a match with no recorded errors always carries a value
            Ok(val.unwrap_or_default())
        } else {
            Err(self.take_errs())
        }
    }

    /// Synthesise the "no match found" diagnostic from the farthest-failure
    /// tracker: deduplicate and sort the expected set, rewriting the
    /// not-any token `!.` into a trailing `EOF`.
    fn report_no_match(&mut self, start_rule: &'g Rule) {
        let mut expected = self.fail.expected().to_vec();
        expected.sort();
        expected.dedup();
        let eof = expected.iter().any(|want| want == "!.");
        expected.retain(|want| want != "!.");
        if eof {
            expected.push("EOF".to_owned());
        }
        let message = list_join(&expected, ", ", "or");
        let pos = self.fail.max_pos();
        self.rstack.push(start_rule);
        self.add_err_at(ErrorKind::NoMatch(message), pos, expected);
        self.rstack.pop();
    }

    fn build_rules_table(&mut self) {
        let grammar = self.grammar;
        self.rules.reserve(grammar.rules().len());
        for rule in grammar.rules() {
            self.rules.insert(rule.name(), rule);
        }
    }

    fn take_errs(&mut self) -> ErrorList {
        let mut errs = std::mem::take(&mut self.errs);
        errs.dedupe();
        errs
    }

    /// Advance the cursor, recording an encoding error when it decodes an
    /// invalid byte and invalid input is not allowed.
    pub(crate) fn read_rune(&mut self) {
        if !self.cursor.read() {
            self.add_err(ErrorKind::InvalidEncoding);
        }
    }

    pub(crate) fn add_err(&mut self, inner: ErrorKind) {
        self.add_err_at(inner, self.cursor.pos(), Vec::new());
    }

    pub(crate) fn add_err_at(&mut self, inner: ErrorKind, pos: Pos, expected: Vec<String>) {
        let mut prefix = String::new();
        if !self.filename.is_empty() {
            prefix.push_str(&self.filename);
            prefix.push(':');
        }
        let _ = write!(prefix, "{}:{} ({})", pos.line, pos.col, pos.offset);
        if let Some(rule) = self.rstack.last() {
            let _ = write!(prefix, ": rule {}", rule.diagnostic_name());
        }
        self.errs.push(ParserError {
            inner,
            pos,
            prefix,
            expected,
        });
    }
}
