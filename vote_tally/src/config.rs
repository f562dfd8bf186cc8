// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// An award grouping under which candidates receive votes independently.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A player eligible to receive votes. The same roster is shown under every category.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    /// Jersey number
    pub number: i64,
    pub avatar_url: Option<String>,
}

/// A pre-summed count of votes for one candidate in one category.
///
/// This is what the query layer delivers, never an individual ballot.
/// The count is expected to be non-negative but it is not validated: any value
/// is carried through the computations as given.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct VoteAggregateRow {
    pub category_id: String,
    pub candidate_id: String,
    pub vote_count: i64,
}

impl VoteAggregateRow {
    pub fn new(category_id: &str, candidate_id: &str, vote_count: i64) -> VoteAggregateRow {
        VoteAggregateRow {
            category_id: category_id.to_string(),
            candidate_id: candidate_id.to_string(),
            vote_count,
        }
    }
}

/// One voter's choice of a candidate within a category.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Ballot {
    pub voter: String,
    pub category_id: String,
    pub candidate_id: String,
}

impl Ballot {
    pub fn new(voter: &str, category_id: &str, candidate_id: &str) -> Ballot {
        Ballot {
            voter: voter.to_string(),
            category_id: category_id.to_string(),
            candidate_id: candidate_id.to_string(),
        }
    }
}

// ******** Output data structures *********

/// The outcome of a tally.
///
/// Both maps are ordered by key so that two results computed from the same rows
/// compare equal and print identically.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct TallyResult {
    /// candidate id -> total number of votes across all the categories
    pub totals: BTreeMap<String, i64>,
    /// category id -> winning candidate id
    pub winners: BTreeMap<String, String>,
}

/// One line of a leaderboard.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Standing {
    pub candidate_id: String,
    pub votes: i64,
}

// ********* Rules **********

/// The order in which the rows are folded.
///
/// Winners are decided on the first row with the highest count, so the order
/// of the rows is the tiebreak.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RowOrder {
    /// Rows are processed as delivered by the query layer.
    AsGiven,
    /// Rows are sorted by category id then candidate id before processing.
    /// The sort is stable.
    ByCategoryThenCandidate,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    pub row_order: RowOrder,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        row_order: RowOrder::AsGiven,
    };
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::DEFAULT_RULES
    }
}

/// What happens when a voter submits a second ballot in the same category.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ConflictPolicy {
    /// The new ballot replaces the previous one.
    Overwrite,
    /// The new ballot is refused.
    Reject,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        ConflictPolicy::Overwrite
    }
}

// ********* Errors **********

/// Errors returned by the ballot box.
///
/// The display form is meant to be shown to the voter or the administrator as is.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotError {
    EmptyVoterName,
    EmptyName,
    VotingClosed,
    UnknownCategory(String),
    UnknownCandidate(String),
    DuplicateCategory(String),
    AlreadyVoted { voter: String, category_id: String },
}

impl Error for BallotError {}

impl Display for BallotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotError::EmptyVoterName => write!(f, "Please enter your name"),
            BallotError::EmptyName => write!(f, "The name cannot be empty"),
            BallotError::VotingClosed => write!(f, "Voting is closed"),
            BallotError::UnknownCategory(id) => write!(f, "Unknown category {}", id),
            BallotError::UnknownCandidate(id) => write!(f, "Unknown candidate {}", id),
            BallotError::DuplicateCategory(name) => {
                write!(f, "A category named {:?} already exists", name)
            }
            BallotError::AlreadyVoted { voter, category_id } => write!(
                f,
                "The name {:?} has already been used to vote in category {}",
                voter, category_id
            ),
        }
    }
}
