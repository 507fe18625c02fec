//! Mutable per-parse state: the variable stack, the recovery stack and the
//! farthest-failure tracker.

use compact_str::CompactString;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::grammar::Expr;
use crate::input::Pos;
use crate::value::Value;

/// One frame of labelled sub-match values, read by action callbacks.
pub type VarFrame = HashMap<CompactString, Value, ahash::RandomState>;

/// Stack of variable frames. Every operator that must isolate its child's
/// captures pushes a frame around the recursion; only the top frame is ever
/// written. Popped frames keep their allocation for reuse.
#[derive(Debug, Default)]
pub(crate) struct VarStack {
    frames: Vec<VarFrame>,
    live: usize,
}

impl VarStack {
    pub(crate) fn push_frame(&mut self) {
        if self.live == self.frames.len() {
            self.frames.push(VarFrame::default());
        }
        self.live += 1;
    }

    pub(crate) fn pop_frame(&mut self) {
        debug_assert!(self.live > 0, "variable stack underflow");
        self.live -= 1;
        self.frames[self.live].clear();
    }

    /// The top frame. Callers hold the invariant that at least one frame is
    /// live (every rule entry pushes one).
    pub(crate) fn top(&self) -> &VarFrame {
        &self.frames[self.live - 1]
    }

    pub(crate) fn top_mut(&mut self) -> &mut VarFrame {
        &mut self.frames[self.live - 1]
    }

    pub(crate) const fn depth(&self) -> usize {
        self.live
    }
}

/// Stack of label → recovery-expression frames installed by Recovery
/// operators and consulted, newest first, by Throw.
#[derive(Debug, Default)]
pub(crate) struct RecoveryStack<'g> {
    frames: Vec<HashMap<CompactString, &'g Expr, ahash::RandomState>>,
}

impl<'g> RecoveryStack<'g> {
    /// Push a frame mapping each label to the same recovery expression.
    pub(crate) fn push(&mut self, labels: &[CompactString], expr: &'g Expr) {
        let mut frame = HashMap::with_capacity_and_hasher(labels.len(), ahash::RandomState::default());
        for label in labels {
            frame.insert(label.clone(), expr);
        }
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) {
        debug_assert!(!self.frames.is_empty(), "recovery stack underflow");
        self.frames.pop();
    }

    /// Recovery expressions registered for `label`, newest frame first.
    pub(crate) fn matches(&self, label: &str) -> SmallVec<[&'g Expr; 4]> {
        self.frames
            .iter()
            .rev()
            .filter_map(|frame| frame.get(label).copied())
            .collect()
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Farthest-failure tracking for the "expected X or Y" diagnostic.
///
/// `invert` is toggled around negative-predicate evaluation so that a
/// *match* inside `Not` is what counts as a failure, recorded with a `!`
/// prefix on the expected token.
#[derive(Debug)]
pub(crate) struct FailureTracker {
    max_pos: Pos,
    expected: Vec<String>,
    invert: bool,
}

impl FailureTracker {
    pub(crate) fn new() -> Self {
        Self {
            max_pos: Pos::new(1, 1, 0),
            expected: Vec::with_capacity(20),
            invert: false,
        }
    }

    /// Record a match outcome at `pos`. Fires only when the outcome counts
    /// as a failure in the current polarity: `matched == invert`.
    pub(crate) fn fail_at(&mut self, matched: bool, pos: Pos, want: &str) {
        if matched != self.invert {
            return;
        }
        if pos.offset < self.max_pos.offset {
            return;
        }
        if pos.offset > self.max_pos.offset {
            self.max_pos = pos;
            self.expected.clear();
        }
        if self.invert {
            self.expected.push(format!("!{want}"));
        } else {
            self.expected.push(want.to_owned());
        }
    }

    pub(crate) fn toggle_invert(&mut self) {
        self.invert = !self.invert;
    }

    pub(crate) const fn max_pos(&self) -> Pos {
        self.max_pos
    }

    pub(crate) fn expected(&self) -> &[String] {
        &self.expected
    }
}
