//! The expression evaluator.
//!
//! Every operator is a synchronous recursive call over the expression tree.
//! Match failure is the ordinary `Ok(None)` return path consumed by the
//! backtracking operators. The two fatal conditions (the expression budget
//! and a captured callback panic) unwind through every frame as
//! [`Fatal`] and are translated to errors by the top-level dispatch in
//! [`Parser::parse`](super::Parser::parse).
//!
//! Stack discipline: each operator restores variable-frame and
//! recovery-frame depth before propagating any result, fatal included, so
//! frame depths are balanced around every evaluator call.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use compact_str::CompactString;
use tracing::trace;

use crate::error::ErrorKind;
use crate::grammar::char_class::{fold_lower, CharClassMatcher};
use crate::grammar::{ActionFn, CallbackError, Expr, ExprKind, LitMatcher, PredicateFn, Rule};
use crate::input::{Pos, Savepoint};
use crate::parser::context::MatchContext;
use crate::parser::Parser;
use crate::value::Value;

/// A condition that aborts the whole parse.
#[derive(Debug)]
pub(crate) enum Fatal {
    /// The expression budget was exceeded.
    MaxExprCnt,
    /// An action or predicate callback panicked while `Recover` is on.
    Panic(String),
}

/// `Ok(Some(_))` match, `Ok(None)` ordinary failure, `Err(_)` abort.
pub(crate) type EvalResult = Result<Option<Value>, Fatal>;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "action callback aborted".to_owned()
    }
}

impl<'g, 'i> Parser<'g, 'i> {
    /// Evaluate a rule: push it onto the rule-context stack, give it a
    /// fresh variable frame, and run its root expression.
    pub(crate) fn parse_rule(&mut self, rule: &'g Rule) -> EvalResult {
        if self.debug {
            trace!(rule = rule.name(), pos = %self.cursor.pos(), "enter rule");
        }
        self.rstack.push(rule);
        self.vstack.push_frame();
        let res = self.eval(rule.expr());
        self.vstack.pop_frame();
        self.rstack.pop();
        if self.debug {
            let matched = matches!(res, Ok(Some(_)));
            trace!(rule = rule.name(), pos = %self.cursor.pos(), matched, "exit rule");
        }
        res
    }

    pub(crate) fn eval(&mut self, expr: &'g Expr) -> EvalResult {
        self.stats.expr_cnt += 1;
        if self.max_expr_cnt != 0 && self.stats.expr_cnt > self.max_expr_cnt {
            return Err(Fatal::MaxExprCnt);
        }

        match &expr.kind {
            ExprKind::Choice(alternatives) => self.eval_choice(expr.pos, alternatives),
            ExprKind::Seq(exprs) => self.eval_seq(exprs),
            ExprKind::Action { expr, run } => self.eval_action(expr, *run),
            ExprKind::Labeled { label, expr } => self.eval_labeled(label, expr),
            ExprKind::And(expr) => self.eval_and(expr),
            ExprKind::Not(expr) => self.eval_not(expr),
            ExprKind::AndCode(run) => self.eval_and_code(*run),
            ExprKind::NotCode(run) => self.eval_not_code(*run),
            ExprKind::ZeroOrOne(expr) => self.eval_zero_or_one(expr),
            ExprKind::ZeroOrMore(expr) => self.eval_zero_or_more(expr),
            ExprKind::OneOrMore(expr) => self.eval_one_or_more(expr),
            ExprKind::RuleRef(name) => self.eval_rule_ref(name),
            ExprKind::Throw(label) => self.eval_throw(label),
            ExprKind::Recovery {
                expr,
                recover,
                labels,
            } => self.eval_recovery(expr, recover, labels),
            ExprKind::Lit(lit) => self.eval_lit(lit),
            ExprKind::Class(class) => self.eval_class(class),
            ExprKind::Any => self.eval_any(),
        }
    }

    /// Ordered choice: first alternative to match wins, regardless of
    /// length. A failed alternative restores nothing here; restoring on
    /// internal failure is each alternative's own responsibility.
    fn eval_choice(&mut self, pos: Pos, alternatives: &'g [Expr]) -> EvalResult {
        for (idx, alternative) in alternatives.iter().enumerate() {
            self.vstack.push_frame();
            let res = self.eval(alternative);
            self.vstack.pop_frame();
            if let Some(val) = res? {
                self.inc_choice_alt(pos, Some(idx));
                return Ok(Some(val));
            }
        }
        self.inc_choice_alt(pos, None);
        Ok(None)
    }

    fn inc_choice_alt(&mut self, pos: Pos, alternative: Option<usize>) {
        let rule = self.rstack.last().map_or("", |r| r.name());
        let ident = format!("{rule}:{}:{}", pos.line, pos.col);
        let key = match alternative {
            Some(idx) => (idx + 1).to_string(),
            None => self.choice_no_match.to_string(),
        };
        self.stats.inc_choice_alt(ident, key);
    }

    fn eval_seq(&mut self, exprs: &'g [Expr]) -> EvalResult {
        let pt = self.cursor.save();
        let mut vals = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match self.eval(expr)? {
                Some(val) => vals.push(val),
                None => {
                    self.cursor.restore(pt);
                    return Ok(None);
                }
            }
        }
        Ok(Some(Value::List(vals)))
    }

    fn eval_action(&mut self, expr: &'g Expr, run: ActionFn) -> EvalResult {
        let start = self.cursor.save();
        let Some(_) = self.eval(expr)? else {
            return Ok(None);
        };
        let val = match self.call_action(run, &start)? {
            Ok(val) => val,
            Err(err) => {
                self.add_err_at(ErrorKind::Callback(err), start.pos, Vec::new());
                Value::Unit
            }
        };
        Ok(Some(val))
    }

    fn call_action(
        &mut self,
        run: ActionFn,
        start: &Savepoint,
    ) -> Result<Result<Value, CallbackError>, Fatal> {
        let recover = self.recover_panics;
        let mut ctx = MatchContext {
            pos: start.pos,
            text: self.cursor.slice_from(start),
            vars: self.vstack.top(),
            store: &mut self.store,
            stats: &self.stats,
        };
        if recover {
            match catch_unwind(AssertUnwindSafe(|| run(&mut ctx))) {
                Ok(out) => Ok(out),
                Err(payload) => Err(Fatal::Panic(panic_message(payload.as_ref()))),
            }
        } else {
            Ok(run(&mut ctx))
        }
    }

    fn eval_labeled(&mut self, label: &CompactString, expr: &'g Expr) -> EvalResult {
        self.vstack.push_frame();
        let res = self.eval(expr);
        self.vstack.pop_frame();
        let val = res?;
        if let Some(val) = &val {
            if !label.is_empty() {
                // the push/pop above isolated the child's captures; the
                // binding itself lands in the enclosing frame
                self.vstack.top_mut().insert(label.clone(), val.clone());
            }
        }
        Ok(val)
    }

    fn eval_and(&mut self, expr: &'g Expr) -> EvalResult {
        let pt = self.cursor.save();
        self.vstack.push_frame();
        let res = self.eval(expr);
        self.vstack.pop_frame();
        self.cursor.restore(pt);
        Ok(res?.map(|_| Value::Unit))
    }

    fn eval_not(&mut self, expr: &'g Expr) -> EvalResult {
        let pt = self.cursor.save();
        self.vstack.push_frame();
        self.fail.toggle_invert();
        let res = self.eval(expr);
        self.fail.toggle_invert();
        self.vstack.pop_frame();
        self.cursor.restore(pt);
        match res? {
            Some(_) => Ok(None),
            None => Ok(Some(Value::Unit)),
        }
    }

    fn eval_and_code(&mut self, run: PredicateFn) -> EvalResult {
        let ok = self.call_predicate(run)?;
        Ok(ok.then_some(Value::Unit))
    }

    fn eval_not_code(&mut self, run: PredicateFn) -> EvalResult {
        let ok = self.call_predicate(run)?;
        Ok((!ok).then_some(Value::Unit))
    }

    fn call_predicate(&mut self, run: PredicateFn) -> Result<bool, Fatal> {
        let recover = self.recover_panics;
        let mut ctx = MatchContext {
            pos: self.cursor.pos(),
            text: &[],
            vars: self.vstack.top(),
            store: &mut self.store,
            stats: &self.stats,
        };
        let out = if recover {
            match catch_unwind(AssertUnwindSafe(|| run(&mut ctx))) {
                Ok(out) => out,
                Err(payload) => return Err(Fatal::Panic(panic_message(payload.as_ref()))),
            }
        } else {
            run(&mut ctx)
        };
        match out {
            Ok(ok) => Ok(ok),
            Err(err) => {
                self.add_err(ErrorKind::Callback(err));
                Ok(false)
            }
        }
    }

    fn eval_zero_or_one(&mut self, expr: &'g Expr) -> EvalResult {
        self.vstack.push_frame();
        let res = self.eval(expr);
        self.vstack.pop_frame();
        // whether it matched or not, consider it a match
        Ok(Some(res?.unwrap_or_default()))
    }

    fn eval_zero_or_more(&mut self, expr: &'g Expr) -> EvalResult {
        let mut vals = Vec::new();
        loop {
            self.vstack.push_frame();
            let res = self.eval(expr);
            self.vstack.pop_frame();
            match res? {
                Some(val) => vals.push(val),
                None => return Ok(Some(Value::List(vals))),
            }
        }
    }

    fn eval_one_or_more(&mut self, expr: &'g Expr) -> EvalResult {
        let mut vals = Vec::new();
        loop {
            self.vstack.push_frame();
            let res = self.eval(expr);
            self.vstack.pop_frame();
            match res? {
                Some(val) => vals.push(val),
                None => {
                    if vals.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(Value::List(vals)));
                }
            }
        }
    }

    fn eval_rule_ref(&mut self, name: &CompactString) -> EvalResult {
        debug_assert!(!name.is_empty(), "rule reference with empty name");
        let rule = self.rules.get(name.as_str()).copied();
        let Some(rule) = rule else {
            self.add_err(ErrorKind::UndefinedRule(name.clone()));
            return Ok(None);
        };
        self.parse_rule(rule)
    }

    fn eval_throw(&mut self, label: &CompactString) -> EvalResult {
        for recover in self.recovery.matches(label) {
            if let Some(val) = self.eval(recover)? {
                return Ok(Some(val));
            }
        }
        Ok(None)
    }

    fn eval_recovery(
        &mut self,
        expr: &'g Expr,
        recover: &'g Expr,
        labels: &[CompactString],
    ) -> EvalResult {
        self.recovery.push(labels, recover);
        let res = self.eval(expr);
        self.recovery.pop();
        res
    }

    fn eval_lit(&mut self, lit: &LitMatcher) -> EvalResult {
        let start = self.cursor.save();
        for want in lit.val().chars() {
            let (mut cur, mut want) = (self.cursor.rune(), want);
            if lit.ignore_case() {
                cur = fold_lower(cur);
                want = fold_lower(want);
            }
            if cur != want {
                self.fail.fail_at(false, start.pos, lit.display());
                self.cursor.restore(start);
                return Ok(None);
            }
            self.read_rune();
        }
        self.fail.fail_at(true, start.pos, lit.display());
        Ok(Some(Value::Bytes(self.cursor.slice_from(&start).to_vec())))
    }

    fn eval_class(&mut self, class: &CharClassMatcher) -> EvalResult {
        let start = self.cursor.save();
        let cur = self.cursor.rune();

        if (cur as u32) < 128 {
            if class.basic_latin(cur) != class.inverted() {
                self.read_rune();
                self.fail.fail_at(true, start.pos, class.display());
                return Ok(Some(Value::Bytes(self.cursor.slice_from(&start).to_vec())));
            }
            self.fail.fail_at(false, start.pos, class.display());
            return Ok(None);
        }

        // a class never matches end of input
        if self.cursor.at_eof() {
            self.fail.fail_at(false, start.pos, class.display());
            return Ok(None);
        }

        let folded = if class.ignore_case() {
            fold_lower(cur)
        } else {
            cur
        };
        if class.in_sets(folded) != class.inverted() {
            self.read_rune();
            self.fail.fail_at(true, start.pos, class.display());
            return Ok(Some(Value::Bytes(self.cursor.slice_from(&start).to_vec())));
        }
        self.fail.fail_at(false, start.pos, class.display());
        Ok(None)
    }

    fn eval_any(&mut self) -> EvalResult {
        if self.cursor.at_eof() {
            self.fail.fail_at(false, self.cursor.pos(), ".");
            return Ok(None);
        }
        let start = self.cursor.save();
        self.read_rune();
        self.fail.fail_at(true, start.pos, ".");
        Ok(Some(Value::Bytes(self.cursor.slice_from(&start).to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    fn parser<'g, 'i>(grammar: &'g Grammar, input: &'i [u8]) -> Parser<'g, 'i> {
        let mut p = Parser::new("", input, grammar);
        p.build_rules_table();
        p.read_rune();
        p
    }

    fn lit_grammar() -> Grammar {
        Grammar::new(vec![Rule::new("S", Expr::lit("ab"))])
    }

    #[test]
    fn test_seq_restores_cursor_on_failure() {
        let grammar = Grammar::new(vec![Rule::new(
            "S",
            Expr::seq(vec![Expr::lit("a"), Expr::lit("b")]),
        )]);
        let mut p = parser(&grammar, b"ax");
        let offset_before = p.cursor.pos().offset;
        let res = p.parse_rule(&grammar.rules()[0]).unwrap();
        assert!(res.is_none());
        assert_eq!(p.cursor.pos().offset, offset_before);
    }

    #[test]
    fn test_lit_restores_cursor_on_partial_match() {
        let grammar = lit_grammar();
        let mut p = parser(&grammar, b"ax");
        let res = p.eval(grammar.rules()[0].expr()).unwrap();
        assert!(res.is_none());
        assert_eq!(p.cursor.pos().offset, 0);
    }

    #[test]
    fn test_predicates_consume_nothing() {
        let grammar = Grammar::new(vec![
            Rule::new("And", Expr::and(Expr::lit("a"))),
            Rule::new("Not", Expr::not(Expr::lit("z"))),
        ]);
        let mut p = parser(&grammar, b"abc");
        let res = p.parse_rule(&grammar.rules()[0]).unwrap();
        assert_eq!(res, Some(Value::Unit));
        assert_eq!(p.cursor.pos().offset, 0);
        let res = p.parse_rule(&grammar.rules()[1]).unwrap();
        assert_eq!(res, Some(Value::Unit));
        assert_eq!(p.cursor.pos().offset, 0);
    }

    #[test]
    fn test_frame_depth_balanced_after_success_and_failure() {
        let grammar = Grammar::new(vec![Rule::new(
            "S",
            Expr::choice(vec![
                Expr::labeled("a", Expr::lit("a")),
                Expr::opt(Expr::lit("b")),
            ]),
        )]);
        let mut p = parser(&grammar, b"a");
        assert_eq!(p.vstack.depth(), 0);
        let res = p.parse_rule(&grammar.rules()[0]).unwrap();
        assert!(res.is_some());
        assert_eq!(p.vstack.depth(), 0);
        assert_eq!(p.recovery.depth(), 0);
    }

    #[test]
    fn test_choice_commits_to_first_match() {
        // second alternative would match more input, PEG ignores it
        let grammar = Grammar::new(vec![Rule::new(
            "S",
            Expr::choice(vec![Expr::lit("a"), Expr::lit("ab")]),
        )]);
        let mut p = parser(&grammar, b"ab");
        let res = p.parse_rule(&grammar.rules()[0]).unwrap();
        assert_eq!(res, Some(Value::Bytes(b"a".to_vec())));
        assert_eq!(p.cursor.pos().offset, 1);
    }

    #[test]
    fn test_zero_or_one_always_matches() {
        let grammar = Grammar::new(vec![Rule::new("S", Expr::opt(Expr::lit("x")))]);
        let mut p = parser(&grammar, b"y");
        let res = p.parse_rule(&grammar.rules()[0]).unwrap();
        assert_eq!(res, Some(Value::Unit));
        assert_eq!(p.cursor.pos().offset, 0);
    }

    #[test]
    fn test_repetition_collects_values() {
        let grammar = Grammar::new(vec![Rule::new("S", Expr::star(Expr::any()))]);
        let mut p = parser(&grammar, "aé".as_bytes());
        let res = p.parse_rule(&grammar.rules()[0]).unwrap();
        let Some(Value::List(vals)) = res else {
            panic!("expected list");
        };
        assert_eq!(vals.len(), 2);
        assert_eq!(vals[1], Value::Bytes("é".as_bytes().to_vec()));
    }

    #[test]
    fn test_one_or_more_requires_one() {
        let grammar = Grammar::new(vec![Rule::new("S", Expr::plus(Expr::lit("x")))]);
        let mut p = parser(&grammar, b"y");
        assert!(p.parse_rule(&grammar.rules()[0]).unwrap().is_none());
    }

    #[test]
    fn test_undefined_rule_records_error() {
        let grammar = Grammar::new(vec![Rule::new("S", Expr::rule_ref("Ghost"))]);
        let mut p = parser(&grammar, b"x");
        let res = p.parse_rule(&grammar.rules()[0]).unwrap();
        assert!(res.is_none());
        assert_eq!(p.errs.len(), 1);
        assert!(p.errs.first().unwrap().to_string().contains("undefined rule: Ghost"));
    }

    #[test]
    fn test_labeled_binds_into_enclosing_frame() {
        let grammar = Grammar::new(vec![Rule::new("S", Expr::labeled("x", Expr::lit("a")))]);
        let mut p = parser(&grammar, b"a");
        p.vstack.push_frame();
        let res = p.eval(grammar.rules()[0].expr()).unwrap();
        assert!(res.is_some());
        assert_eq!(
            p.vstack.top().get("x"),
            Some(&Value::Bytes(b"a".to_vec()))
        );
        p.vstack.pop_frame();
    }

    #[test]
    fn test_expression_budget_aborts() {
        let grammar = Grammar::new(vec![Rule::new("S", Expr::star(Expr::any()))]);
        let mut p = parser(&grammar, b"aaaaaaaaaa");
        p.max_expr_cnt = 3;
        let res = p.parse_rule(&grammar.rules()[0]);
        assert!(matches!(res, Err(Fatal::MaxExprCnt)));
        // frame depths stay balanced even across the abort
        assert_eq!(p.vstack.depth(), 0);
    }

    #[test]
    fn test_farthest_failure_is_monotonic() {
        let grammar = Grammar::new(vec![Rule::new(
            "S",
            Expr::choice(vec![
                Expr::seq(vec![Expr::lit("ab"), Expr::lit("c")]),
                Expr::lit("a"),
            ]),
        )]);
        let mut p = parser(&grammar, b"abd");
        let res = p.parse_rule(&grammar.rules()[0]).unwrap();
        // second alternative matched, but the tracker keeps the deep failure
        assert!(res.is_some());
        assert_eq!(p.fail.max_pos().offset, 2);
        assert_eq!(p.fail.expected(), ["\"c\""]);
    }
}
