//! Parsing-expression trees.
//!
//! The evaluator dispatches over [`ExprKind`], a closed tagged union; the
//! grammar source position every compiler-emitted node carries lives in the
//! shared [`Expr`] header. Builder helpers construct nodes at the default
//! position for hand-written grammars; [`Expr::with_pos`] pins the position
//! when it matters (choice statistics, debug events).

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::grammar::char_class::CharClassMatcher;
use crate::input::Pos;
use crate::parser::context::MatchContext;
use crate::value::Value;

/// Error type produced by user callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Semantic-action callback: computes the value of a successful match from
/// the current match context. Returning an error records it without failing
/// the match.
pub type ActionFn = fn(&mut MatchContext<'_, '_>) -> Result<Value, CallbackError>;

/// Code-predicate callback: decides whether the match may proceed, without
/// consuming input.
pub type PredicateFn = fn(&mut MatchContext<'_, '_>) -> Result<bool, CallbackError>;

/// One node of a parsing-expression tree.
#[derive(Debug, Clone)]
pub struct Expr {
    /// Position of the expression in the grammar source.
    pub pos: Pos,
    pub kind: ExprKind,
}

/// The expression variants the evaluator understands.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Ordered choice: first alternative to match wins.
    Choice(Vec<Expr>),
    /// All sub-expressions in order; restores the cursor on failure.
    Seq(Vec<Expr>),
    /// Run the child, then replace its value with the callback's.
    Action { expr: Box<Expr>, run: ActionFn },
    /// Bind the child's value to `label` in the enclosing variable frame.
    Labeled { label: CompactString, expr: Box<Expr> },
    /// Positive syntactic predicate; consumes nothing.
    And(Box<Expr>),
    /// Negative syntactic predicate; consumes nothing.
    Not(Box<Expr>),
    /// Positive code predicate; consumes nothing.
    AndCode(PredicateFn),
    /// Negative code predicate; consumes nothing.
    NotCode(PredicateFn),
    ZeroOrOne(Box<Expr>),
    ZeroOrMore(Box<Expr>),
    OneOrMore(Box<Expr>),
    /// Evaluate the named rule.
    RuleRef(CompactString),
    /// Non-local jump to the innermost recovery frame carrying the label.
    Throw(CompactString),
    /// Install `recover` for each label in `labels` while `expr` runs.
    Recovery {
        expr: Box<Expr>,
        recover: Box<Expr>,
        labels: SmallVec<[CompactString; 4]>,
    },
    Lit(LitMatcher),
    Class(CharClassMatcher),
    /// Match any single rune; fails only at end of input.
    Any,
}

/// Literal matcher: a fixed rune sequence, optionally case-insensitive.
#[derive(Debug, Clone)]
pub struct LitMatcher {
    val: CompactString,
    ignore_case: bool,
    display: CompactString,
}

impl LitMatcher {
    #[must_use]
    pub fn new(val: &str, ignore_case: bool) -> Self {
        let mut display = CompactString::new(format!("{val:?}"));
        if ignore_case {
            display.push('i');
        }
        Self {
            val: CompactString::new(val),
            ignore_case,
            display,
        }
    }

    #[must_use]
    pub fn val(&self) -> &str {
        &self.val
    }

    #[must_use]
    pub const fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Display form used in failure diagnostics, e.g. `"ok"` or `"ok"i`.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl Expr {
    #[must_use]
    pub const fn new(pos: Pos, kind: ExprKind) -> Self {
        Self { pos, kind }
    }

    #[must_use]
    pub const fn with_pos(mut self, pos: Pos) -> Self {
        self.pos = pos;
        self
    }

    #[must_use]
    pub fn choice(alternatives: Vec<Expr>) -> Self {
        Self::new(Pos::default(), ExprKind::Choice(alternatives))
    }

    #[must_use]
    pub fn seq(exprs: Vec<Expr>) -> Self {
        Self::new(Pos::default(), ExprKind::Seq(exprs))
    }

    #[must_use]
    pub fn action(expr: Expr, run: ActionFn) -> Self {
        Self::new(
            Pos::default(),
            ExprKind::Action {
                expr: Box::new(expr),
                run,
            },
        )
    }

    #[must_use]
    pub fn labeled(label: &str, expr: Expr) -> Self {
        Self::new(
            Pos::default(),
            ExprKind::Labeled {
                label: CompactString::new(label),
                expr: Box::new(expr),
            },
        )
    }

    #[must_use]
    pub fn and(expr: Expr) -> Self {
        Self::new(Pos::default(), ExprKind::And(Box::new(expr)))
    }

    #[must_use]
    pub fn not(expr: Expr) -> Self {
        Self::new(Pos::default(), ExprKind::Not(Box::new(expr)))
    }

    #[must_use]
    pub fn and_code(run: PredicateFn) -> Self {
        Self::new(Pos::default(), ExprKind::AndCode(run))
    }

    #[must_use]
    pub fn not_code(run: PredicateFn) -> Self {
        Self::new(Pos::default(), ExprKind::NotCode(run))
    }

    #[must_use]
    pub fn opt(expr: Expr) -> Self {
        Self::new(Pos::default(), ExprKind::ZeroOrOne(Box::new(expr)))
    }

    #[must_use]
    pub fn star(expr: Expr) -> Self {
        Self::new(Pos::default(), ExprKind::ZeroOrMore(Box::new(expr)))
    }

    #[must_use]
    pub fn plus(expr: Expr) -> Self {
        Self::new(Pos::default(), ExprKind::OneOrMore(Box::new(expr)))
    }

    #[must_use]
    pub fn rule_ref(name: &str) -> Self {
        Self::new(Pos::default(), ExprKind::RuleRef(CompactString::new(name)))
    }

    #[must_use]
    pub fn throw(label: &str) -> Self {
        Self::new(Pos::default(), ExprKind::Throw(CompactString::new(label)))
    }

    #[must_use]
    pub fn recover(expr: Expr, recover: Expr, labels: &[&str]) -> Self {
        Self::new(
            Pos::default(),
            ExprKind::Recovery {
                expr: Box::new(expr),
                recover: Box::new(recover),
                labels: labels.iter().map(|l| CompactString::new(l)).collect(),
            },
        )
    }

    #[must_use]
    pub fn lit(val: &str) -> Self {
        Self::new(Pos::default(), ExprKind::Lit(LitMatcher::new(val, false)))
    }

    /// Case-insensitive literal (`"abc"i` in grammar source).
    #[must_use]
    pub fn lit_insensitive(val: &str) -> Self {
        Self::new(Pos::default(), ExprKind::Lit(LitMatcher::new(val, true)))
    }

    #[must_use]
    pub fn class(matcher: CharClassMatcher) -> Self {
        Self::new(Pos::default(), ExprKind::Class(matcher))
    }

    #[must_use]
    pub fn any() -> Self {
        Self::new(Pos::default(), ExprKind::Any)
    }
}
