//! Parse options.
//!
//! Applying an option returns the previous setting as a new option, so a
//! caller can override a setting for one parse and hand the returned option
//! back to restore it afterwards.

use compact_str::CompactString;

use crate::parser::Parser;
use crate::value::Value;

/// A single parser setting.
#[derive(Debug)]
pub enum ParseOption {
    /// Stop parsing after this many evaluator invocations; `0` means
    /// unlimited. The default is `0`.
    MaxExpressions(u64),
    /// Rule to start parsing at. The empty string selects the first rule
    /// in the grammar, which is also the default.
    Entrypoint(CompactString),
    /// Treat invalid UTF-8 bytes as U+FFFD instead of recording an
    /// encoding error. The default is `false`.
    AllowInvalidUtf8(bool),
    /// Capture panics raised inside action callbacks and convert them to a
    /// parse error. The default is `true`; turning it off lets the panic
    /// propagate with its full backtrace while debugging.
    Recover(bool),
    /// Seed a key in the persistent global store.
    GlobalStore(CompactString, Value),
    /// Emit `tracing` events for rule evaluation. The default is `false`.
    Debug(bool),
    /// Label recorded in the choice statistics when no alternative of an
    /// ordered choice matched. The default is the empty string.
    Statistics(CompactString),
}

impl ParseOption {
    /// Install the option and return the previous setting.
    pub fn apply(self, parser: &mut Parser<'_, '_>) -> Self {
        match self {
            Self::MaxExpressions(n) => {
                let old = parser.max_expr_cnt;
                parser.max_expr_cnt = n;
                Self::MaxExpressions(old)
            }
            Self::Entrypoint(name) => {
                let old = parser.entrypoint.clone();
                parser.set_entrypoint(&name);
                Self::Entrypoint(old)
            }
            Self::AllowInvalidUtf8(allow) => {
                let old = parser.cursor.allow_invalid_utf8();
                parser.cursor.set_allow_invalid_utf8(allow);
                Self::AllowInvalidUtf8(old)
            }
            Self::Recover(recover) => {
                let old = parser.recover_panics;
                parser.recover_panics = recover;
                Self::Recover(old)
            }
            Self::GlobalStore(key, value) => {
                let old = parser.store.insert(key.clone(), value).unwrap_or_default();
                Self::GlobalStore(key, old)
            }
            Self::Debug(debug) => {
                let old = parser.debug;
                parser.debug = debug;
                Self::Debug(old)
            }
            Self::Statistics(label) => {
                let old = parser.choice_no_match.clone();
                parser.choice_no_match = label;
                Self::Statistics(old)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expr, Grammar, Rule};

    fn grammar() -> Grammar {
        Grammar::new(vec![
            Rule::new("A", Expr::lit("a")),
            Rule::new("B", Expr::lit("b")),
        ])
    }

    #[test]
    fn test_apply_returns_previous() {
        let g = grammar();
        let mut parser = Parser::new("", b"a", &g);
        let prev = ParseOption::MaxExpressions(10).apply(&mut parser);
        assert!(matches!(prev, ParseOption::MaxExpressions(0)));
        let prev = ParseOption::MaxExpressions(0).apply(&mut parser);
        assert!(matches!(prev, ParseOption::MaxExpressions(10)));
    }

    #[test]
    fn test_empty_entrypoint_selects_first_rule() {
        let g = grammar();
        let mut parser = Parser::new("", b"a", &g);
        ParseOption::Entrypoint("B".into()).apply(&mut parser);
        assert_eq!(parser.entrypoint, "B");
        ParseOption::Entrypoint("".into()).apply(&mut parser);
        assert_eq!(parser.entrypoint, "A");
    }

    #[test]
    fn test_global_store_roundtrip() {
        let g = grammar();
        let mut parser = Parser::new("", b"a", &g);
        let prev = ParseOption::GlobalStore("k".into(), Value::Int(1)).apply(&mut parser);
        assert!(matches!(prev, ParseOption::GlobalStore(_, Value::Unit)));
        let prev = ParseOption::GlobalStore("k".into(), Value::Int(2)).apply(&mut parser);
        assert!(matches!(prev, ParseOption::GlobalStore(_, Value::Int(1))));
    }
}
