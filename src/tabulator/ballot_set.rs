//! Per-ballot progression through the ranks.

use super::numeric::{NumericModel, Votes};
use super::tabulation::{CandidateSet, Destination, Transfers};
use crate::config::OvervoteRule;
use crate::model::election::{Ballot, CandidateId, Choice};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Rank(usize),
    /// No eligible choice remains. Terminal.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct BallotState {
    position: Position,
    current: Option<CandidateId>,
    weight: Votes,
}

impl BallotState {
    fn new(weight: Votes) -> BallotState {
        BallotState {
            position: Position::Rank(0),
            current: None,
            weight,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// The candidate this ballot currently counts for, as of the last settlement.
    pub fn current(&self) -> Option<CandidateId> {
        self.current
    }

    pub fn is_exhausted(&self) -> bool {
        self.position == Position::Exhausted
    }

    fn exhaust(&mut self) {
        self.position = Position::Exhausted;
        self.current = None;
    }
}

/// Rules that decide which rank entries a ballot may rest on.
#[derive(Debug, Clone, Copy)]
pub struct SettlePolicy<'a> {
    pub continuing: &'a CandidateSet,
    pub overvote_rule: OvervoteRule,
    pub max_skipped_ranks: Option<u32>,
    pub exhaust_on_duplicate: bool,
    /// Upper bound on pointer advances for one ballot in one settlement.
    pub step_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ballot {ballot_id} still unsettled after {steps} rank advances")]
pub struct SettleError {
    pub ballot_id: String,
    pub steps: usize,
}

enum Step {
    Count(CandidateId),
    Skip,
    Exhaust,
}

fn classify(choices: &[Choice], rank: usize, policy: &SettlePolicy) -> Step {
    match &choices[rank] {
        Choice::Candidate(c) => {
            let repeated = choices[..rank]
                .iter()
                .any(|earlier| earlier == &Choice::Candidate(*c));
            if repeated && policy.exhaust_on_duplicate {
                Step::Exhaust
            } else if policy.continuing.contains(*c) {
                Step::Count(*c)
            } else {
                Step::Skip
            }
        }
        Choice::Undervote => {
            let run = choices[..=rank]
                .iter()
                .rev()
                .take_while(|choice| **choice == Choice::Undervote)
                .count();
            match policy.max_skipped_ranks {
                Some(limit) if run > limit as usize => Step::Exhaust,
                _ => Step::Skip,
            }
        }
        Choice::WriteIn => Step::Skip,
        Choice::Overvote(marks) => match policy.overvote_rule {
            OvervoteRule::AlwaysSkipToNextRank => Step::Skip,
            OvervoteRule::ExhaustImmediately => Step::Exhaust,
            OvervoteRule::ExhaustIfMultipleContinuing => {
                let mut continuing = marks.iter().filter(|c| policy.continuing.contains(**c));
                match (continuing.next(), continuing.next()) {
                    (None, _) => Step::Skip,
                    (Some(c), None) => Step::Count(*c),
                    (Some(_), Some(_)) => Step::Exhaust,
                }
            }
        },
    }
}

fn settle_ballot(
    ballot: &Ballot,
    state: &mut BallotState,
    policy: &SettlePolicy,
) -> Result<(), SettleError> {
    let mut steps = 0;
    loop {
        let rank = match state.position {
            Position::Exhausted => {
                state.current = None;
                return Ok(());
            }
            Position::Rank(rank) => rank,
        };
        if rank >= ballot.choices.len() {
            state.exhaust();
            return Ok(());
        }

        match classify(&ballot.choices, rank, policy) {
            Step::Count(c) => {
                state.current = Some(c);
                return Ok(());
            }
            Step::Exhaust => {
                state.exhaust();
                return Ok(());
            }
            Step::Skip => {
                state.position = Position::Rank(rank + 1);
                state.current = None;
            }
        }

        steps += 1;
        if steps > policy.step_limit {
            return Err(SettleError {
                ballot_id: ballot.id.clone(),
                steps,
            });
        }
    }
}

/// The mutable counting state of every ballot in a contest.
#[derive(Debug, Clone)]
pub struct BallotSet<'a> {
    ballots: &'a [Ballot],
    states: Vec<BallotState>,
}

impl<'a> BallotSet<'a> {
    /// Every ballot starts at its first rank with `initial_weight`. Nothing
    /// counts until the first [`BallotSet::settle`].
    pub fn new(ballots: &'a [Ballot], initial_weight: Votes) -> BallotSet<'a> {
        let states = ballots
            .iter()
            .map(|_| BallotState::new(initial_weight.clone()))
            .collect();
        BallotSet { ballots, states }
    }

    pub fn states(&self) -> &[BallotState] {
        &self.states
    }

    /// Move every ballot past entries it may not rest on, until each one
    /// either counts for a continuing candidate or is exhausted.
    pub fn settle(&mut self, policy: &SettlePolicy) -> Result<(), SettleError> {
        self.states
            .par_iter_mut()
            .zip(self.ballots.par_iter())
            .try_for_each(|(state, ballot)| settle_ballot(ballot, state, policy))
    }

    /// Multiply the weight of the selected ballots by `ratio`.
    pub fn scale_weight<F>(&mut self, mask: F, ratio: &Votes, model: NumericModel)
    where
        F: Fn(&BallotState) -> bool + Sync,
    {
        self.states.par_iter_mut().for_each(|state| {
            if mask(state) {
                state.weight = model.mul(&state.weight, ratio);
            }
        });
    }

    /// Step the selected counting ballots one rank forward, leaving them
    /// unsettled. Returns each moved ballot's index and the candidate it left.
    pub fn advance<F>(&mut self, mask: F) -> Vec<(usize, CandidateId)>
    where
        F: Fn(&BallotState) -> bool,
    {
        let mut moved = Vec::new();
        for (i, state) in self.states.iter_mut().enumerate() {
            if !mask(state) {
                continue;
            }
            if let (Some(c), Position::Rank(rank)) = (state.current, state.position) {
                state.position = Position::Rank(rank + 1);
                state.current = None;
                moved.push((i, c));
            }
        }
        moved
    }

    /// Move ballots sitting on any of `from` to their next eligible choice and
    /// report where their weight went.
    pub fn transfer(
        &mut self,
        from: &CandidateSet,
        policy: &SettlePolicy,
    ) -> Result<Transfers, SettleError> {
        let moved = self.advance(|state| state.current.map_or(false, |c| from.contains(c)));
        debug!("advancing {} ballots", moved.len());

        self.settle(policy)?;

        let mut transfers = Transfers::new();
        for (i, source) in moved {
            let state = &self.states[i];
            let destination = match state.current {
                Some(c) => Destination::Candidate(c),
                None => Destination::Exhausted,
            };
            transfers.add(source, destination, &state.weight);
        }
        Ok(transfers)
    }

    /// Weight of non-exhausted ballots per contending candidate. Every
    /// contending candidate appears, with zero if nobody ranks them now.
    pub fn tally(&self, contending: &[CandidateId]) -> BTreeMap<CandidateId, Votes> {
        let mut totals: BTreeMap<CandidateId, Votes> = contending
            .iter()
            .map(|c| (*c, Votes::zero()))
            .collect();

        let partial = self
            .states
            .par_iter()
            .filter_map(|state| state.current.map(|c| (c, &state.weight)))
            .fold(BTreeMap::new, |mut acc: BTreeMap<CandidateId, Votes>, (c, weight)| {
                *acc.entry(c).or_insert_with(Votes::zero) += weight;
                acc
            })
            .reduce(BTreeMap::new, |mut left, right| {
                for (c, weight) in right {
                    *left.entry(c).or_insert_with(Votes::zero) += weight;
                }
                left
            });

        for (c, weight) in partial {
            if let Some(total) = totals.get_mut(&c) {
                *total += weight;
            }
        }
        totals
    }

    pub fn exhausted_weight(&self) -> Votes {
        self.states
            .iter()
            .filter(|s| s.is_exhausted())
            .map(|s| &s.weight)
            .sum()
    }

    pub fn total_weight(&self) -> Votes {
        self.states.iter().map(|s| &s.weight).sum()
    }
}
