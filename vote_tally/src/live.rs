//! Keeping a tally current as change notifications come in.
//!
//! The results dashboard holds a [`LiveTally`]. Each notification from the change
//! feed is handed to [`LiveTally::on_change`], which fetches the aggregate rows
//! again and recomputes the tally.

use log::{debug, info, warn};
use std::convert::Infallible;

use crate::ballot_box::BallotBox;
use crate::config::*;
use crate::compute_tally_with;

/// Something that can deliver the current aggregate rows of a voting event.
pub trait AggregateSource {
    type Error;

    fn fetch_rows(&self) -> Result<Vec<VoteAggregateRow>, Self::Error>;

    /// Whether voting is currently open, if the source knows it.
    fn voting_open(&self) -> Option<bool> {
        None
    }
}

impl AggregateSource for Vec<VoteAggregateRow> {
    type Error = Infallible;

    fn fetch_rows(&self) -> Result<Vec<VoteAggregateRow>, Infallible> {
        Ok(self.clone())
    }
}

impl AggregateSource for BallotBox {
    type Error = Infallible;

    fn fetch_rows(&self) -> Result<Vec<VoteAggregateRow>, Infallible> {
        Ok(self.aggregate_rows())
    }

    fn voting_open(&self) -> Option<bool> {
        Some(self.is_voting_open())
    }
}

/// A notification from the change feed.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ChangeEvent {
    /// Some votes changed. No detail about the change is carried.
    DataChanged,
    /// Voting was opened or closed.
    VotingToggled(bool),
}

pub struct LiveTally<S: AggregateSource> {
    source: S,
    rules: TallyRules,
    tally: TallyResult,
    voting_open: bool,
    refreshes: u64,
}

impl<S: AggregateSource> LiveTally<S> {
    pub fn new(source: S, rules: &TallyRules) -> LiveTally<S> {
        LiveTally {
            source,
            rules: rules.clone(),
            tally: TallyResult::default(),
            voting_open: true,
            refreshes: 0,
        }
    }

    /// Initial fetch. The voting flag is read from the source when it has one.
    pub fn load(&mut self) -> Result<&TallyResult, S::Error> {
        self.refresh()
    }

    /// Reacts to a notification of the change feed.
    ///
    /// If the rows cannot be fetched, the error is returned and the previous
    /// tally is kept.
    pub fn on_change(&mut self, event: ChangeEvent) -> Result<&TallyResult, S::Error> {
        debug!("on_change: {:?}", event);
        match event {
            ChangeEvent::DataChanged => self.refresh(),
            ChangeEvent::VotingToggled(open) => {
                self.voting_open = open;
                Ok(&self.tally)
            }
        }
    }

    fn refresh(&mut self) -> Result<&TallyResult, S::Error> {
        let rows = match self.source.fetch_rows() {
            Ok(rows) => rows,
            Err(e) => {
                warn!("refresh: failed to fetch rows, keeping previous tally");
                return Err(e);
            }
        };
        // Sources without a voting flag leave the last known state.
        if let Some(open) = self.source.voting_open() {
            self.voting_open = open;
        }
        self.tally = compute_tally_with(&rows, &self.rules);
        self.refreshes += 1;
        info!(
            "refresh #{}: {} rows, {} winners",
            self.refreshes,
            rows.len(),
            self.tally.winners.len()
        );
        Ok(&self.tally)
    }

    pub fn tally(&self) -> &TallyResult {
        &self.tally
    }

    pub fn voting_open(&self) -> bool {
        self.voting_open
    }

    /// Number of successful recomputations.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Gives access to the source, for example to record a ballot before
    /// signalling the change.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
