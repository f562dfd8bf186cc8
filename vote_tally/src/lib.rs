/*!
Tallying of category-based polls.

The votes arrive as aggregate rows (category, candidate, count) and are folded
into the total number of votes for each candidate and a single winner for each
category.

```
use vote_tally::{compute_tally, VoteAggregateRow};

let rows = vec![
    VoteAggregateRow::new("best-player", "alice", 3),
    VoteAggregateRow::new("best-player", "bob", 7),
    VoteAggregateRow::new("best-goal", "alice", 1),
];
let result = compute_tally(&rows);
assert_eq!(result.totals["alice"], 4);
assert_eq!(result.winners["best-player"], "bob");
```
*/

mod config;
pub mod ballot_box;
pub mod builder;
pub mod live;
pub mod manual;

use log::{debug, info};

use std::collections::{BTreeMap, HashMap};

pub use crate::config::*;

/// Computes the total votes per candidate and the winner of each category.
///
/// The rows are processed in the order given. A category's winner is the first
/// row seen with the strictly greatest count for that category: a later row with
/// the same count does not replace it.
///
/// The computation cannot fail. Negative counts are not rejected and are
/// compared and summed like any other count. Totals saturate at the bounds of
/// `i64`.
pub fn compute_tally(rows: &[VoteAggregateRow]) -> TallyResult {
    compute_tally_with(rows, &TallyRules::DEFAULT_RULES)
}

/// Same as [`compute_tally`], with control over the order in which rows are folded.
pub fn compute_tally_with(rows: &[VoteAggregateRow], rules: &TallyRules) -> TallyResult {
    debug!(
        "compute_tally_with: processing {:?} rows, rules: {:?}",
        rows.len(),
        rules
    );
    let ordered: Vec<&VoteAggregateRow> = ordered_rows(rows, rules.row_order);

    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    // category id -> (candidate id, best count so far)
    let mut best: HashMap<&str, (&str, i64)> = HashMap::new();

    for row in ordered {
        // Saturates instead of overflowing on malformed counts.
        let total = totals.entry(row.candidate_id.clone()).or_insert(0);
        *total = total.saturating_add(row.vote_count);

        // Strictly greater: on equal counts the first row seen stays the winner.
        let replace = match best.get(row.category_id.as_str()) {
            Some((_, best_count)) => row.vote_count > *best_count,
            None => true,
        };
        if replace {
            best.insert(
                row.category_id.as_str(),
                (row.candidate_id.as_str(), row.vote_count),
            );
        }
    }

    let winners: BTreeMap<String, String> = best
        .into_iter()
        .map(|(cat, (cand, _))| (cat.to_string(), cand.to_string()))
        .collect();

    for (cat, cand) in winners.iter() {
        debug!("compute_tally_with: category {} -> {}", cat, cand);
    }
    TallyResult { totals, winners }
}

fn ordered_rows(rows: &[VoteAggregateRow], order: RowOrder) -> Vec<&VoteAggregateRow> {
    let mut res: Vec<&VoteAggregateRow> = rows.iter().collect();
    match order {
        RowOrder::AsGiven => {}
        RowOrder::ByCategoryThenCandidate => {
            res.sort_by(|a, b| {
                a.category_id
                    .cmp(&b.category_id)
                    .then_with(|| a.candidate_id.cmp(&b.candidate_id))
            });
        }
    }
    res
}

/// Turns individual ballots into aggregate rows: one vote per ballot.
///
/// Rows come out in the order in which each (category, candidate) pair first
/// appears. Superseded ballots are not removed here, see [`latest_ballots`].
pub fn aggregate_ballots(ballots: &[Ballot]) -> Vec<VoteAggregateRow> {
    let mut positions: HashMap<(&str, &str), usize> = HashMap::new();
    let mut res: Vec<VoteAggregateRow> = Vec::new();
    for b in ballots.iter() {
        let key = (b.category_id.as_str(), b.candidate_id.as_str());
        if let Some(idx) = positions.get(&key) {
            res[*idx].vote_count = res[*idx].vote_count.saturating_add(1);
        } else {
            positions.insert(key, res.len());
            res.push(VoteAggregateRow::new(&b.category_id, &b.candidate_id, 1));
        }
    }
    info!(
        "aggregate_ballots: {:?} ballots -> {:?} rows",
        ballots.len(),
        res.len()
    );
    res
}

/// Keeps a single ballot per voter and category.
///
/// A later ballot from the same voter in the same category supersedes the
/// earlier one and takes its place in the sequence. Voter names are compared
/// after trimming.
pub fn latest_ballots(ballots: &[Ballot]) -> Vec<Ballot> {
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut res: Vec<Ballot> = Vec::new();
    for b in ballots.iter() {
        let voter = b.voter.trim().to_string();
        let key = (voter.clone(), b.category_id.clone());
        let ballot = Ballot {
            voter,
            category_id: b.category_id.clone(),
            candidate_id: b.candidate_id.clone(),
        };
        if let Some(idx) = positions.get(&key) {
            debug!(
                "latest_ballots: {:?} replaces {:?}",
                ballot, res[*idx].candidate_id
            );
            res[*idx] = ballot;
        } else {
            positions.insert(key, res.len());
            res.push(ballot);
        }
    }
    res
}

/// All the candidates ordered by decreasing number of votes.
///
/// Candidates with the same number of votes keep the order in which they first
/// appear in the rows.
pub fn standings(rows: &[VoteAggregateRow]) -> Vec<Standing> {
    sorted_standings(rows.iter())
}

/// The candidates of one category ordered by decreasing number of votes.
pub fn category_standings(rows: &[VoteAggregateRow], category_id: &str) -> Vec<Standing> {
    sorted_standings(rows.iter().filter(|r| r.category_id == category_id))
}

fn sorted_standings<'a>(rows: impl Iterator<Item = &'a VoteAggregateRow>) -> Vec<Standing> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut res: Vec<Standing> = Vec::new();
    for r in rows {
        if let Some(idx) = positions.get(r.candidate_id.as_str()) {
            res[*idx].votes = res[*idx].votes.saturating_add(r.vote_count);
        } else {
            positions.insert(r.candidate_id.as_str(), res.len());
            res.push(Standing {
                candidate_id: r.candidate_id.clone(),
                votes: r.vote_count,
            });
        }
    }
    // sort_by is stable
    res.sort_by(|a, b| b.votes.cmp(&a.votes));
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn row(cat: &str, cand: &str, count: i64) -> VoteAggregateRow {
        VoteAggregateRow::new(cat, cand, count)
    }

    #[test]
    fn empty_rows() {
        let res = compute_tally(&[]);
        assert!(res.totals.is_empty());
        assert!(res.winners.is_empty());
    }

    #[test]
    fn first_seen_wins_ties() {
        let res = compute_tally(&[row("A", "X", 5), row("A", "Y", 5)]);
        assert_eq!(res.winners.get("A"), Some(&"X".to_string()));
    }

    #[test]
    fn totals_are_candidate_scoped() {
        let res = compute_tally(&[row("A", "X", 3), row("A", "Y", 7), row("A", "X", 1)]);
        assert_eq!(res.totals.get("X"), Some(&4));
        assert_eq!(res.totals.get("Y"), Some(&7));
        assert_eq!(res.winners.get("A"), Some(&"Y".to_string()));
    }

    #[test]
    fn totals_span_categories() {
        let rows = vec![
            row("best-player", "X", 2),
            row("best-goal", "X", 5),
            row("best-goal", "Y", 6),
        ];
        let res = compute_tally(&rows);
        assert_eq!(res.totals.get("X"), Some(&7));
        assert_eq!(res.winners.get("best-player"), Some(&"X".to_string()));
        assert_eq!(res.winners.get("best-goal"), Some(&"Y".to_string()));
    }

    #[test]
    fn sum_of_totals_matches_rows() {
        let rows = vec![
            row("A", "X", 3),
            row("B", "Y", 11),
            row("A", "Z", 0),
            row("C", "X", 8),
            row("B", "Z", 2),
        ];
        let res = compute_tally(&rows);
        let total: i64 = res.totals.values().sum();
        assert_eq!(total, rows.iter().map(|r| r.vote_count).sum::<i64>());
    }

    #[test]
    fn every_category_with_rows_has_a_winner() {
        let rows = vec![row("A", "X", 0), row("B", "Y", 1), row("C", "Z", 0)];
        let res = compute_tally(&rows);
        let cats: Vec<&String> = res.winners.keys().collect();
        assert_eq!(cats, vec!["A", "B", "C"]);
        // A zero count still designates a winner when it is the only row.
        assert_eq!(res.winners.get("A"), Some(&"X".to_string()));
    }

    #[test]
    fn negative_counts_are_taken_as_given() {
        let rows = vec![row("A", "X", -2), row("A", "Y", -1), row("A", "X", 1)];
        let res = compute_tally(&rows);
        assert_eq!(res.totals.get("X"), Some(&-1));
        assert_eq!(res.totals.get("Y"), Some(&-1));
        assert_eq!(res.winners.get("A"), Some(&"X".to_string()));
    }

    #[test]
    fn totals_saturate() {
        let rows = vec![row("A", "X", i64::MAX), row("B", "X", 1), row("A", "Y", i64::MIN)];
        let res = compute_tally(&rows);
        assert_eq!(res.totals["X"], i64::MAX);
        assert_eq!(res.totals["Y"], i64::MIN);
        assert_eq!(res.winners["A"], "X");

        let s = standings(&[row("A", "X", i64::MAX), row("A", "X", 1)]);
        assert_eq!(s[0].votes, i64::MAX);
    }

    #[test]
    fn deterministic() {
        let rows = vec![row("A", "X", 4), row("B", "Y", 4), row("A", "Y", 4)];
        let r1 = compute_tally(&rows);
        let r2 = compute_tally(&rows);
        assert_eq!(r1, r2);
    }

    #[test]
    fn stable_row_order_changes_the_tiebreak() {
        init_logs();
        let rows = vec![row("A", "Y", 5), row("A", "X", 5)];
        assert_eq!(compute_tally(&rows).winners["A"], "Y");
        let rules = TallyRules {
            row_order: RowOrder::ByCategoryThenCandidate,
        };
        let res = compute_tally_with(&rows, &rules);
        assert_eq!(res.winners["A"], "X");
        assert_eq!(res.totals, compute_tally(&rows).totals);
    }

    #[test]
    fn aggregate_counts_one_per_ballot() {
        let ballots = vec![
            Ballot::new("ann", "A", "X"),
            Ballot::new("ben", "A", "Y"),
            Ballot::new("cat", "A", "X"),
            Ballot::new("ann", "B", "Y"),
        ];
        let rows = aggregate_ballots(&ballots);
        assert_eq!(
            rows,
            vec![row("A", "X", 2), row("A", "Y", 1), row("B", "Y", 1)]
        );
    }

    #[test]
    fn latest_ballot_supersedes() {
        init_logs();
        let ballots = vec![
            Ballot::new("ann", "A", "X"),
            Ballot::new("ben", "A", "Y"),
            Ballot::new(" ann ", "A", "Y"),
            Ballot::new("ann", "B", "X"),
        ];
        let res = latest_ballots(&ballots);
        assert_eq!(
            res,
            vec![
                Ballot::new("ann", "A", "Y"),
                Ballot::new("ben", "A", "Y"),
                Ballot::new("ann", "B", "X"),
            ]
        );
        let tally = compute_tally(&aggregate_ballots(&res));
        assert_eq!(tally.totals["Y"], 2);
        assert_eq!(tally.totals["X"], 1);
    }

    #[test]
    fn standings_sorted_and_stable() {
        let rows = vec![
            row("A", "X", 2),
            row("A", "Y", 5),
            row("B", "Z", 2),
            row("B", "X", 1),
        ];
        let s = standings(&rows);
        let names: Vec<(&str, i64)> = s
            .iter()
            .map(|st| (st.candidate_id.as_str(), st.votes))
            .collect();
        assert_eq!(names, vec![("Y", 5), ("X", 3), ("Z", 2)]);

        let b = category_standings(&rows, "B");
        let names: Vec<&str> = b.iter().map(|st| st.candidate_id.as_str()).collect();
        assert_eq!(names, vec!["Z", "X"]);
        assert!(category_standings(&rows, "C").is_empty());
    }
}
