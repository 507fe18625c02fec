//! # pegvm
//!
//! A backtracking PEG interpreter runtime.
//!
//! ## Overview
//!
//! `pegvm` evaluates a tree of parsing-expression nodes against a UTF-8
//! byte input, producing either a semantic [`Value`] (built by action
//! callbacks) or a structured list of parse errors. It is the runtime half
//! of a generated-parser pipeline: a grammar compiler emits the expression
//! trees, this crate runs them.
//!
//! - **Ordered choice with backtracking**: alternatives commit on first
//!   success; failed sub-matches restore the cursor exactly.
//! - **Semantic actions and labels**: callbacks read labelled sub-match
//!   values and compute the value of a match.
//! - **Predicates**: syntactic (`&e` / `!e`) and code predicates, none of
//!   which consume input.
//! - **Labelled failures**: `throw`/`recover` substitute a recovery
//!   expression for a failed region, non-locally.
//! - **Bounded work**: an expression budget aborts pathological parses
//!   with a distinguished error.
//!
//! ## Quick start
//!
//! ```rust
//! use pegvm::{parse, CallbackError, CharClassMatcher, Expr, Grammar, MatchContext, Rule, Value};
//!
//! fn on_number(ctx: &mut MatchContext) -> Result<Value, CallbackError> {
//!     Ok(Value::Int(ctx.text_lossy().parse::<i64>()?))
//! }
//!
//! // Number <- [0-9]+, with an action turning the digits into an integer
//! let digits = Expr::plus(Expr::class(
//!     CharClassMatcher::new("[0-9]", false, false).with_ranges([('0', '9')]),
//! ));
//! let grammar = Grammar::new(vec![Rule::new("Number", Expr::action(digits, on_number))]);
//!
//! let value = parse("input.txt", b"1234", &grammar, []).expect("parse failed");
//! assert_eq!(value, Value::Int(1234));
//! ```
//!
//! ## Errors
//!
//! Ordinary match failure is not an error: it drives backtracking and the
//! farthest-failure diagnostic. The [`ErrorList`] a failed parse returns
//! aggregates structured errors: callback errors, undefined rules,
//! encoding problems and the synthesised `no match found, expected: ...`
//! message.
//!
//! ## The global store
//!
//! Callbacks may stash arbitrary values in the global store, seeded with
//! [`ParseOption::GlobalStore`]. The store is **never rolled back** by
//! backtracking; it is the intended escape hatch for accumulating side
//! effects, and keeping it consistent across backtracking is the caller's
//! responsibility.
//!
//! ## Modules
//!
//! - [`input`]: cursor, positions, savepoints
//! - [`grammar`]: expression trees, rules, character classes
//! - [`value`]: the dynamic semantic value
//! - [`error`]: error kinds and the aggregator
//! - [`parser`]: entry points, options, statistics, the evaluator

pub mod error;
pub mod grammar;
pub mod input;
pub mod parser;
pub mod value;

pub use error::{Error, ErrorKind, ErrorList, ParserError};
pub use grammar::{
    ActionFn, CallbackError, CharClassMatcher, Expr, ExprKind, Grammar, LitMatcher, PredicateFn,
    Rule, UnicodeClass,
};
pub use input::{Cursor, Pos, Savepoint};
pub use parser::{
    parse, parse_file, parse_reader, MatchContext, ParseOption, Parser, Stats, StoreDict,
};
pub use value::Value;
