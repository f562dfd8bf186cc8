pub use crate::config::*;

use crate::{aggregate_ballots, compute_tally_with, latest_ballots};

/// A builder for collecting votes before tallying them.
///
/// Aggregate rows and individual ballots can be mixed. Ballots go through the
/// one-ballot-per-voter-and-category rule before being counted.
///
/// ```
/// pub use vote_tally::builder::Builder;
/// pub use vote_tally::TallyRules;
///
/// let mut builder = Builder::new(&TallyRules::DEFAULT_RULES);
///
/// builder.add_row("best-player", "alice", 4);
/// builder.add_ballot("zoe", "best-player", "bob");
/// builder.add_ballot("zoe", "best-player", "alice");
///
/// let result = builder.tally();
/// assert_eq!(result.totals["alice"], 5);
/// assert_eq!(result.winners["best-player"], "alice");
/// assert!(!result.totals.contains_key("bob"));
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _rows: Vec<VoteAggregateRow>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Builder {
        Builder {
            _rules: rules.clone(),
            _rows: Vec::new(),
            _ballots: Vec::new(),
        }
    }

    /// Adds a pre-aggregated count.
    pub fn add_row(&mut self, category_id: &str, candidate_id: &str, vote_count: i64) {
        self.add_row_2(&VoteAggregateRow::new(category_id, candidate_id, vote_count))
    }

    pub fn add_row_2(&mut self, row: &VoteAggregateRow) {
        self._rows.push(row.clone());
    }

    /// Adds the choice of a single voter.
    ///
    /// A later ballot from the same voter in the same category replaces this one.
    pub fn add_ballot(&mut self, voter: &str, category_id: &str, candidate_id: &str) {
        self._ballots
            .push(Ballot::new(voter, category_id, candidate_id));
    }

    /// The aggregate rows: first the rows added directly, then the counted ballots.
    pub fn rows(&self) -> Vec<VoteAggregateRow> {
        let mut res = self._rows.clone();
        res.extend(aggregate_ballots(&latest_ballots(&self._ballots)));
        res
    }

    pub fn tally(&self) -> TallyResult {
        compute_tally_with(&self.rows(), &self._rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_then_ballots() {
        let mut b = Builder::new(&TallyRules::DEFAULT_RULES);
        b.add_ballot("ann", "A", "Y");
        b.add_row("A", "X", 1);
        let rows = b.rows();
        assert_eq!(rows[0], VoteAggregateRow::new("A", "X", 1));
        assert_eq!(rows[1], VoteAggregateRow::new("A", "Y", 1));
        // Tie between X and Y: the direct row comes first.
        assert_eq!(b.tally().winners["A"], "X");
    }

    #[test]
    fn empty_builder() {
        let b = Builder::new(&TallyRules::default());
        assert!(b.rows().is_empty());
        assert_eq!(b.tally(), TallyResult::default());
    }
}
