//! The state behind a voting event: the roster, the ballots and whether voting is open.
//!
//! Every change goes through a method of [`BallotBox`] and the state is passed
//! around explicitly. The aggregate rows it produces feed [`crate::compute_tally`].

use log::{debug, info, warn};
use std::collections::HashMap;

use crate::config::*;
use crate::{aggregate_ballots, compute_tally_with};

/// Result of a successful ballot submission.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotOutcome {
    /// First ballot of this voter in this category.
    Recorded,
    /// The voter had already voted in this category. The previous choice is returned.
    Replaced { previous: String },
}

pub struct BallotBox {
    voting_open: bool,
    conflict_policy: ConflictPolicy,
    rules: TallyRules,
    categories: Vec<Category>,
    candidates: Vec<Candidate>,
    ballots: Vec<Ballot>,
    // (voter, category id) -> position in ballots
    index: HashMap<(String, String), usize>,
    next_id: u64,
}

impl BallotBox {
    pub fn new(conflict_policy: ConflictPolicy, rules: &TallyRules) -> BallotBox {
        BallotBox {
            voting_open: true,
            conflict_policy,
            rules: rules.clone(),
            categories: Vec::new(),
            candidates: Vec::new(),
            ballots: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
        }
    }

    fn new_id(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.next_id);
        self.next_id += 1;
        id
    }

    // ******** Roster *********

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Adds a category and returns its id. Category names are unique.
    pub fn add_category(&mut self, name: &str) -> Result<String, BallotError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BallotError::EmptyName);
        }
        if self.categories.iter().any(|c| c.name == name) {
            return Err(BallotError::DuplicateCategory(name.to_string()));
        }
        let id = self.new_id("category");
        info!("add_category: {} -> {}", name, id);
        self.categories.push(Category {
            id: id.clone(),
            name: name.to_string(),
        });
        Ok(id)
    }

    /// Removes a category and all the ballots cast in it.
    ///
    /// Returns the number of ballots removed.
    pub fn delete_category(&mut self, id: &str) -> Result<usize, BallotError> {
        let pos = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| BallotError::UnknownCategory(id.to_string()))?;
        self.categories.remove(pos);
        let removed = self.retain_ballots(|b| b.category_id != id);
        info!(
            "delete_category: {} removed with {} ballots",
            id, removed
        );
        Ok(removed)
    }

    pub fn add_candidate(
        &mut self,
        name: &str,
        number: i64,
        avatar_url: Option<&str>,
    ) -> Result<String, BallotError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BallotError::EmptyName);
        }
        let id = self.new_id("candidate");
        info!("add_candidate: {} #{} -> {}", name, number, id);
        self.candidates.push(Candidate {
            id: id.clone(),
            name: name.to_string(),
            number,
            avatar_url: clean_avatar(avatar_url),
        });
        Ok(id)
    }

    pub fn update_candidate(
        &mut self,
        id: &str,
        name: &str,
        number: i64,
        avatar_url: Option<&str>,
    ) -> Result<(), BallotError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BallotError::EmptyName);
        }
        let cand = self
            .candidates
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BallotError::UnknownCandidate(id.to_string()))?;
        cand.name = name.to_string();
        cand.number = number;
        cand.avatar_url = clean_avatar(avatar_url);
        debug!("update_candidate: {:?}", cand);
        Ok(())
    }

    /// Removes a candidate and all the ballots cast for them.
    pub fn delete_candidate(&mut self, id: &str) -> Result<usize, BallotError> {
        let pos = self
            .candidates
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| BallotError::UnknownCandidate(id.to_string()))?;
        self.candidates.remove(pos);
        let removed = self.retain_ballots(|b| b.candidate_id != id);
        info!(
            "delete_candidate: {} removed with {} ballots",
            id, removed
        );
        Ok(removed)
    }

    // ******** Voting *********

    pub fn is_voting_open(&self) -> bool {
        self.voting_open
    }

    pub fn set_voting_open(&mut self, open: bool) {
        info!("set_voting_open: {} -> {}", self.voting_open, open);
        self.voting_open = open;
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    /// Records the choice of a voter in a category.
    ///
    /// A voter holds at most one ballot per category. What happens to a second
    /// ballot depends on the conflict policy of this box.
    pub fn submit_ballot(
        &mut self,
        voter: &str,
        category_id: &str,
        candidate_id: &str,
    ) -> Result<BallotOutcome, BallotError> {
        let voter = voter.trim();
        if voter.is_empty() {
            return Err(BallotError::EmptyVoterName);
        }
        if !self.voting_open {
            return Err(BallotError::VotingClosed);
        }
        if self.category(category_id).is_none() {
            return Err(BallotError::UnknownCategory(category_id.to_string()));
        }
        if self.candidate(candidate_id).is_none() {
            return Err(BallotError::UnknownCandidate(candidate_id.to_string()));
        }

        let key = (voter.to_string(), category_id.to_string());
        let ballot = Ballot::new(voter, category_id, candidate_id);
        let existing: Option<usize> = self.index.get(&key).copied();
        match (existing, self.conflict_policy) {
            (Some(_), ConflictPolicy::Reject) => {
                warn!(
                    "submit_ballot: {:?} already voted in {}",
                    voter, category_id
                );
                Err(BallotError::AlreadyVoted {
                    voter: voter.to_string(),
                    category_id: category_id.to_string(),
                })
            }
            (Some(idx), ConflictPolicy::Overwrite) => {
                let previous = std::mem::replace(&mut self.ballots[idx], ballot).candidate_id;
                debug!(
                    "submit_ballot: {:?} in {}: {} -> {}",
                    voter, category_id, previous, candidate_id
                );
                Ok(BallotOutcome::Replaced { previous })
            }
            (None, _) => {
                debug!(
                    "submit_ballot: {:?} in {}: {}",
                    voter, category_id, candidate_id
                );
                self.index.insert(key, self.ballots.len());
                self.ballots.push(ballot);
                Ok(BallotOutcome::Recorded)
            }
        }
    }

    /// Removes the ballots of one category, or all of them.
    ///
    /// Returns the number of ballots removed.
    pub fn reset_votes(&mut self, category_id: Option<&str>) -> usize {
        let removed = match category_id {
            Some(cid) => self.retain_ballots(|b| b.category_id != cid),
            None => self.retain_ballots(|_| false),
        };
        info!("reset_votes: {:?}: {} ballots removed", category_id, removed);
        removed
    }

    fn retain_ballots(&mut self, keep: impl Fn(&Ballot) -> bool) -> usize {
        let before = self.ballots.len();
        self.ballots.retain(|b| keep(b));
        self.index = self
            .ballots
            .iter()
            .enumerate()
            .map(|(idx, b)| ((b.voter.clone(), b.category_id.clone()), idx))
            .collect();
        before - self.ballots.len()
    }

    // ******** Tally *********

    /// The current ballots, counted per category and candidate.
    pub fn aggregate_rows(&self) -> Vec<VoteAggregateRow> {
        aggregate_ballots(&self.ballots)
    }

    pub fn tally(&self) -> TallyResult {
        compute_tally_with(&self.aggregate_rows(), &self.rules)
    }
}

fn clean_avatar(avatar_url: Option<&str>) -> Option<String> {
    match avatar_url.map(|s| s.trim()) {
        Some(s) if !s.is_empty() => Some(s.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A box with two categories and three candidates.
    fn setup(policy: ConflictPolicy) -> (BallotBox, Vec<String>, Vec<String>) {
        let mut bb = BallotBox::new(policy, &TallyRules::DEFAULT_RULES);
        let cats = vec![
            bb.add_category("Best player").unwrap(),
            bb.add_category("Best goal").unwrap(),
        ];
        let cands = vec![
            bb.add_candidate("Alice", 7, None).unwrap(),
            bb.add_candidate("Bob", 10, Some("https://img/bob.png")).unwrap(),
            bb.add_candidate("Chloe", 9, Some("")).unwrap(),
        ];
        (bb, cats, cands)
    }

    #[test]
    fn overwrite_replaces_previous_choice() {
        let (mut bb, cats, cands) = setup(ConflictPolicy::Overwrite);
        assert_eq!(
            bb.submit_ballot("ann", &cats[0], &cands[0]),
            Ok(BallotOutcome::Recorded)
        );
        assert_eq!(
            bb.submit_ballot(" ann ", &cats[0], &cands[1]),
            Ok(BallotOutcome::Replaced {
                previous: cands[0].clone()
            })
        );
        assert_eq!(bb.ballots().len(), 1);
        let res = bb.tally();
        assert_eq!(res.winners[&cats[0]], cands[1]);
        assert!(!res.totals.contains_key(&cands[0]));
    }

    #[test]
    fn default_policy_overwrites() {
        let (mut bb, cats, cands) = setup(ConflictPolicy::default());
        bb.submit_ballot("ann", &cats[0], &cands[0]).unwrap();
        assert!(matches!(
            bb.submit_ballot("ann", &cats[0], &cands[2]),
            Ok(BallotOutcome::Replaced { .. })
        ));
    }

    #[test]
    fn reject_refuses_second_ballot() {
        let (mut bb, cats, cands) = setup(ConflictPolicy::Reject);
        bb.submit_ballot("ann", &cats[0], &cands[0]).unwrap();
        let err = bb.submit_ballot("ann", &cats[0], &cands[1]).unwrap_err();
        assert_eq!(
            err,
            BallotError::AlreadyVoted {
                voter: "ann".to_string(),
                category_id: cats[0].clone()
            }
        );
        // Another category is a separate ballot.
        assert_eq!(
            bb.submit_ballot("ann", &cats[1], &cands[1]),
            Ok(BallotOutcome::Recorded)
        );
        assert_eq!(bb.ballots().len(), 2);
    }

    #[test]
    fn validation_order() {
        let (mut bb, cats, cands) = setup(ConflictPolicy::Overwrite);
        assert_eq!(
            bb.submit_ballot("   ", &cats[0], &cands[0]),
            Err(BallotError::EmptyVoterName)
        );
        assert_eq!(
            bb.submit_ballot("ann", "nope", &cands[0]),
            Err(BallotError::UnknownCategory("nope".to_string()))
        );
        assert_eq!(
            bb.submit_ballot("ann", &cats[0], "nope"),
            Err(BallotError::UnknownCandidate("nope".to_string()))
        );
        bb.set_voting_open(false);
        assert!(!bb.is_voting_open());
        assert_eq!(
            bb.submit_ballot("ann", &cats[0], &cands[0]),
            Err(BallotError::VotingClosed)
        );
        bb.set_voting_open(true);
        assert!(bb.submit_ballot("ann", &cats[0], &cands[0]).is_ok());
    }

    #[test]
    fn roster_management() {
        let (mut bb, cats, cands) = setup(ConflictPolicy::Overwrite);
        assert_eq!(
            bb.add_category(" Best player "),
            Err(BallotError::DuplicateCategory("Best player".to_string()))
        );
        assert_eq!(bb.add_category(""), Err(BallotError::EmptyName));
        assert_eq!(
            bb.candidate(&cands[1]).unwrap().avatar_url.as_deref(),
            Some("https://img/bob.png")
        );
        assert_eq!(bb.candidate(&cands[2]).unwrap().avatar_url, None);

        bb.update_candidate(&cands[0], "Alicia", 8, Some("a.png"))
            .unwrap();
        let a = bb.candidate(&cands[0]).unwrap();
        assert_eq!((a.name.as_str(), a.number), ("Alicia", 8));
        assert_eq!(
            bb.update_candidate("nope", "X", 1, None),
            Err(BallotError::UnknownCandidate("nope".to_string()))
        );
        assert_eq!(bb.category(&cats[1]).unwrap().name, "Best goal");
    }

    #[test]
    fn deletes_cascade() {
        let (mut bb, cats, cands) = setup(ConflictPolicy::Overwrite);
        bb.submit_ballot("ann", &cats[0], &cands[0]).unwrap();
        bb.submit_ballot("ben", &cats[0], &cands[1]).unwrap();
        bb.submit_ballot("ann", &cats[1], &cands[1]).unwrap();

        assert_eq!(bb.delete_candidate(&cands[1]), Ok(2));
        assert_eq!(bb.ballots().len(), 1);
        assert_eq!(bb.delete_category(&cats[0]), Ok(1));
        assert!(bb.ballots().is_empty());
        assert_eq!(bb.categories().len(), 1);
        assert_eq!(
            bb.delete_category(&cats[0]),
            Err(BallotError::UnknownCategory(cats[0].clone()))
        );
    }

    #[test]
    fn reset_and_vote_again() {
        let (mut bb, cats, cands) = setup(ConflictPolicy::Reject);
        bb.submit_ballot("ann", &cats[0], &cands[0]).unwrap();
        bb.submit_ballot("ann", &cats[1], &cands[0]).unwrap();
        bb.submit_ballot("ben", &cats[1], &cands[2]).unwrap();

        assert_eq!(bb.reset_votes(Some(&cats[1])), 2);
        // The index follows the removal: the voter can vote again in that category.
        assert_eq!(
            bb.submit_ballot("ann", &cats[1], &cands[2]),
            Ok(BallotOutcome::Recorded)
        );
        assert!(bb.submit_ballot("ann", &cats[0], &cands[2]).is_err());

        assert_eq!(bb.reset_votes(None), 2);
        assert_eq!(bb.tally(), TallyResult::default());
    }

    #[test]
    fn aggregate_rows_follow_ballots() {
        let (mut bb, cats, cands) = setup(ConflictPolicy::Overwrite);
        bb.submit_ballot("ann", &cats[0], &cands[2]).unwrap();
        bb.submit_ballot("ben", &cats[0], &cands[2]).unwrap();
        bb.submit_ballot("cid", &cats[0], &cands[0]).unwrap();
        assert_eq!(
            bb.aggregate_rows(),
            vec![
                VoteAggregateRow::new(&cats[0], &cands[2], 2),
                VoteAggregateRow::new(&cats[0], &cands[0], 1),
            ]
        );
    }
}
