//! The context handed to action and predicate callbacks.

use std::borrow::Cow;

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::input::Pos;
use crate::parser::state::VarFrame;
use crate::parser::stats::Stats;
use crate::value::Value;

/// The caller-owned persistent store.
///
/// Values written here survive arbitrary backtracking: the parser never
/// rolls this map back. It is the intended escape hatch for accumulating
/// side effects across a parse, and it is entirely up to the callbacks to
/// keep it consistent.
pub type StoreDict = HashMap<CompactString, Value, ahash::RandomState>;

/// View of the current match, passed to action and predicate callbacks.
///
/// For an action this describes the successful child match: its start
/// position and the bytes it consumed, plus the label bindings of the
/// enclosing rule. For a code predicate no match exists yet; `pos` is the
/// current cursor position and `text` is empty.
#[derive(Debug)]
pub struct MatchContext<'p, 'i> {
    pub(crate) pos: Pos,
    pub(crate) text: &'i [u8],
    pub(crate) vars: &'p VarFrame,
    pub(crate) store: &'p mut StoreDict,
    pub(crate) stats: &'p Stats,
}

impl<'p, 'i> MatchContext<'p, 'i> {
    /// Start position of the match.
    #[must_use]
    pub const fn pos(&self) -> Pos {
        self.pos
    }

    /// Raw bytes the match consumed.
    #[must_use]
    pub const fn text(&self) -> &'i [u8] {
        self.text
    }

    /// Matched bytes as text, with invalid sequences replaced.
    #[must_use]
    pub fn text_lossy(&self) -> Cow<'i, str> {
        String::from_utf8_lossy(self.text)
    }

    /// Look up a labelled sub-match value in the current variable frame.
    #[must_use]
    pub fn value(&self, label: &str) -> Option<&Value> {
        self.vars.get(label)
    }

    #[must_use]
    pub fn store(&self) -> &StoreDict {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut StoreDict {
        &mut *self.store
    }

    /// Read-only view of the parse statistics.
    #[must_use]
    pub const fn stats(&self) -> &Stats {
        self.stats
    }
}
