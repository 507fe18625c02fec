//! Grammar definition.
//!
//! A [`Grammar`] is an ordered list of [`Rule`]s, each owning the root of a
//! parsing-expression tree. The grammar compiler emits these; the builder
//! helpers on [`Expr`] exist for hand-written grammars and tests. Grammars
//! are immutable once built and may be shared by reference across parses.

pub mod char_class;
pub mod expr;

pub use char_class::{CharClassMatcher, UnicodeClass};
pub use expr::{ActionFn, CallbackError, Expr, ExprKind, LitMatcher, PredicateFn};

use compact_str::CompactString;

use crate::input::Pos;

/// A named production.
#[derive(Debug, Clone)]
pub struct Rule {
    name: CompactString,
    display_name: Option<CompactString>,
    pos: Pos,
    expr: Expr,
}

impl Rule {
    #[must_use]
    pub fn new(name: &str, expr: Expr) -> Self {
        Self {
            name: CompactString::new(name),
            display_name: None,
            pos: Pos::default(),
            expr,
        }
    }

    /// Human-readable name used in error prefixes instead of `name`.
    #[must_use]
    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(CompactString::new(display_name));
        self
    }

    #[must_use]
    pub const fn with_pos(mut self, pos: Pos) -> Self {
        self.pos = pos;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// The name shown in diagnostics: the display name when present.
    #[must_use]
    pub fn diagnostic_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub const fn pos(&self) -> Pos {
        self.pos
    }

    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }
}

/// An ordered set of rules. The first rule is the default entrypoint.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    rules: Vec<Rule>,
}

impl Grammar {
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Linear lookup by rule name. The parser builds a hash table instead;
    /// this is for one-off inspection.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }
}
