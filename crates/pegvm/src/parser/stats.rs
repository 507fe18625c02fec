//! Per-parse statistics.

use hashbrown::HashMap;

/// Statistics gathered during a single parse.
#[derive(Debug, Default)]
pub struct Stats {
    /// Number of evaluator invocations so far. Compared against the
    /// `MaxExpressions` cap.
    pub expr_cnt: u64,

    /// For each ordered choice (keyed `"<rule>:<line>:<col>"` by grammar
    /// source position), how often each alternative matched. Inner keys are
    /// the one-based alternative index, or the configured no-match label
    /// when no alternative matched. These counts allow reordering the
    /// alternatives of hot choices offline.
    pub choice_alt_cnt:
        HashMap<String, HashMap<String, usize, ahash::RandomState>, ahash::RandomState>,
}

impl Stats {
    pub(crate) fn inc_choice_alt(&mut self, ident: String, alt: String) {
        *self
            .choice_alt_cnt
            .entry(ident)
            .or_default()
            .entry(alt)
            .or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inc_choice_alt() {
        let mut stats = Stats::default();
        stats.inc_choice_alt("S:1:5".to_owned(), "1".to_owned());
        stats.inc_choice_alt("S:1:5".to_owned(), "1".to_owned());
        stats.inc_choice_alt("S:1:5".to_owned(), "2".to_owned());
        let inner = &stats.choice_alt_cnt["S:1:5"];
        assert_eq!(inner["1"], 2);
        assert_eq!(inner["2"], 1);
    }
}
