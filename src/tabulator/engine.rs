use super::ballot_set::{BallotSet, SettlePolicy};
use super::numeric::{ArithmeticError, NumericModel, Votes};
use super::quota::QuotaCalculator;
use super::tabulation::{CandidateSet, Tabulation, TabulationRound, Transfers};
use super::tiebreak::{TieDirection, TieError, TieResolver, Tiebreaker};
use super::{Result, TabulationError};
use crate::config::{ElectionRules, OvervoteRule, WinnerElectionMode};
use crate::model::election::{CandidateId, Choice, Election};
use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initializing,
    RoundInProgress,
    Complete,
}

/// Drives one tabulation run from validated input to a finished [`Tabulation`].
#[derive(Debug)]
pub struct RoundEngine<'e> {
    election: &'e Election,
    rules: &'e ElectionRules,
    model: NumericModel,
    quota: QuotaCalculator,
    tiebreaker: Tiebreaker,
    /// Roster minus excluded candidates.
    eligible: CandidateSet,
    step_limit: usize,
    /// Most rounds allowed in one pass.
    round_limit: usize,
}

impl<'e> RoundEngine<'e> {
    /// Check rules and ballots. Nothing is counted until [`RoundEngine::tabulate`].
    pub fn new(election: &'e Election, rules: &'e ElectionRules) -> Result<RoundEngine<'e>> {
        rules
            .validate()
            .map_err(|e| TabulationError::Configuration(e.to_string()))?;

        let roster: Vec<CandidateId> = election.candidate_ids().collect();
        let mut eligible = CandidateSet::empty(roster.len());
        for id in &roster {
            if election.candidate(*id).map_or(false, |c| !c.excluded) {
                eligible.insert(*id);
            }
        }
        if eligible.is_empty() {
            return Err(TabulationError::Configuration(
                "no eligible candidates".to_string(),
            ));
        }
        let seats = rules.number_of_winners as usize;
        if eligible.len() < seats {
            return Err(TabulationError::Configuration(format!(
                "{} seats but only {} eligible candidates",
                seats,
                eligible.len()
            )));
        }

        validate_ballots(election, rules)?;

        let longest = election
            .ballots
            .iter()
            .map(|b| b.choices.len())
            .max()
            .unwrap_or(0);
        let step_limit = rules
            .max_rankings_allowed
            .map_or(longest, |limit| limit as usize);

        Ok(RoundEngine {
            election,
            rules,
            model: rules.numeric_model(),
            quota: QuotaCalculator::from_rules(rules),
            tiebreaker: Tiebreaker::new(rules.tiebreak_mode, rules.random_seed, &roster),
            eligible,
            step_limit,
            round_limit: roster.len(),
        })
    }

    /// Answer `stopCountingAndAsk` ties through `resolver`.
    pub fn with_tie_resolver(mut self, resolver: Box<dyn TieResolver>) -> RoundEngine<'e> {
        self.tiebreaker = self.tiebreaker.with_resolver(resolver);
        self
    }

    /// Stop with a non-termination error once a pass needs more than `limit`
    /// rounds. Never raises the roster-size bound.
    pub fn with_round_limit(mut self, limit: usize) -> RoundEngine<'e> {
        self.round_limit = self.round_limit.min(limit);
        self
    }

    pub fn tabulate(mut self) -> Result<Tabulation<'e>> {
        let mut tabulation = Tabulation::new(self.fresh_ballots());
        let mut phase = Phase::Initializing;

        loop {
            phase = match phase {
                Phase::Initializing => {
                    info!(
                        "Tabulating {} ballots, {} candidates, {} seat(s), {:?}",
                        self.election.ballots.len(),
                        self.eligible.len(),
                        self.rules.number_of_winners,
                        self.rules.winner_election_mode
                    );
                    Phase::RoundInProgress
                }
                Phase::RoundInProgress => {
                    self.check_round_bound(&tabulation)?;
                    let round = self.tabulate_round(&mut tabulation)?;
                    let elected = !round.winners.is_empty();
                    tabulation.record(round);

                    if self.is_complete(&tabulation, elected) {
                        Phase::Complete
                    } else {
                        if elected
                            && self.rules.winner_election_mode == WinnerElectionMode::MultiPassIrv
                        {
                            info!("Starting pass {}", tabulation.pass + 1);
                            tabulation.begin_pass(self.fresh_ballots());
                        }
                        Phase::RoundInProgress
                    }
                }
                Phase::Complete => break,
            };
        }

        info!(
            "Tabulation complete after {} rounds; elected: {}",
            tabulation.rounds.len(),
            self.names(&tabulation.winners)
        );
        Ok(tabulation)
    }

    fn fresh_ballots(&self) -> BallotSet<'e> {
        BallotSet::new(&self.election.ballots, Votes::one())
    }

    fn check_round_bound(&self, tabulation: &Tabulation) -> Result<()> {
        let in_pass = tabulation
            .rounds
            .iter()
            .filter(|r| r.pass == tabulation.pass)
            .count();
        let bound = self.round_limit;
        if in_pass >= bound {
            return Err(TabulationError::NonTermination {
                round: tabulation.rounds.len() as u32 + 1,
                detail: format!("more than {} rounds in pass {}", bound, tabulation.pass),
                history: tabulation.rounds.clone(),
            });
        }
        Ok(())
    }

    fn is_complete(&self, tabulation: &Tabulation, elected_this_round: bool) -> bool {
        match self.rules.winner_election_mode {
            WinnerElectionMode::BottomsUpUsingPercentageThreshold => elected_this_round,
            WinnerElectionMode::BottomsUp
            | WinnerElectionMode::SingleWinnerMajority
            | WinnerElectionMode::MultiWinnerAllowMultipleWinnersPerRound
            | WinnerElectionMode::MultiWinnerAllowOnlyOneWinnerPerRound
            | WinnerElectionMode::MultiPassIrv => {
                tabulation.winners.len() >= self.rules.number_of_winners as usize
            }
        }
    }

    /// Seats still open in the current count. Each multi-pass IRV pass fills one;
    /// percentage counts have no fixed seats.
    fn seats_remaining(&self, tabulation: &Tabulation) -> u32 {
        match self.rules.winner_election_mode {
            WinnerElectionMode::MultiPassIrv => 1,
            WinnerElectionMode::BottomsUpUsingPercentageThreshold => 0,
            _ => self
                .rules
                .number_of_winners
                .saturating_sub(tabulation.winners.len() as u32),
        }
    }

    fn continuing(&self, tabulation: &Tabulation) -> CandidateSet {
        let mut set = self.eligible.clone();
        for c in tabulation.winners.iter().chain(tabulation.losers.iter()) {
            set.remove(*c);
        }
        set
    }

    fn policy<'p>(&self, continuing: &'p CandidateSet) -> SettlePolicy<'p> {
        SettlePolicy {
            continuing,
            overvote_rule: self.rules.overvote_rule,
            max_skipped_ranks: self.rules.max_skipped_ranks_allowed,
            exhaust_on_duplicate: self.rules.exhaust_on_duplicate_candidate,
            step_limit: self.step_limit,
        }
    }

    fn tabulate_round(&mut self, tabulation: &mut Tabulation<'e>) -> Result<TabulationRound> {
        let round_number = tabulation.rounds.len() as u32 + 1;

        // Settle.
        let continuing = self.continuing(tabulation);
        let policy = self.policy(&continuing);
        tabulation
            .ballot_set
            .settle(&policy)
            .map_err(|e| non_termination(round_number, e.to_string(), tabulation))?;

        // Tally.
        let contending: Vec<CandidateId> = continuing.ids().collect();
        let totals = tabulation.ballot_set.tally(&contending);
        let continuing_total: Votes = totals.values().sum();
        let exhausted = tabulation.ballot_set.exhausted_weight();

        // Threshold.
        let seats = self.seats_remaining(tabulation);
        let threshold = self
            .quota
            .threshold(&continuing_total, seats)
            .map_err(|e| arithmetic(round_number, e, tabulation))?;

        info!(
            "Round {} (pass {}), threshold {}, continuing {}, exhausted {}",
            round_number, tabulation.pass, threshold, continuing_total, exhausted
        );
        for (c, total) in &totals {
            debug!("  {:>12} {}", total.to_string(), self.election.candidate_name(*c));
        }

        let mut round = TabulationRound {
            round_number,
            pass: tabulation.pass,
            vote_threshold: threshold.clone(),
            vote_totals: totals,
            winners: Vec::new(),
            losers: Vec::new(),
            transfers: Transfers::new(),
            exhausted,
            retained: Votes::zero(),
        };

        round.winners = self
            .select_winners(&round, seats, tabulation)
            .map_err(|e| self.unresolved_tie(round_number, e, tabulation))?;

        if !round.winners.is_empty() {
            info!("  elected: {}", self.names(&round.winners));
            let (transfers, retained) =
                self.transfer_surplus(&round, &continuing, tabulation)?;
            round.transfers = transfers;
            round.retained = retained;
        } else {
            round.losers = self.select_losers(&round, seats, tabulation)?;
            info!("  eliminated: {}", self.names(&round.losers));
            round.transfers = self.transfer_losers(&round, &continuing, tabulation)?;
        }

        Ok(round)
    }

    fn select_winners(
        &mut self,
        round: &TabulationRound,
        seats: u32,
        tabulation: &Tabulation,
    ) -> std::result::Result<Vec<CandidateId>, TieError> {
        let totals = &round.vote_totals;
        let threshold = &round.vote_threshold;
        let mode = self.rules.winner_election_mode;

        // Remaining candidates fill the remaining seats. This also covers the
        // Hare quota, which no one can exceed on the last seat.
        if mode != WinnerElectionMode::BottomsUpUsingPercentageThreshold
            && seats > 0
            && totals.len() <= seats as usize
        {
            return Ok(by_total_desc(totals, totals.keys().copied()));
        }

        let above: Vec<CandidateId> = totals
            .iter()
            .filter(|(_, t)| self.model.compare(t, threshold) == Ordering::Greater)
            .map(|(c, _)| *c)
            .collect();

        let winners = match mode {
            WinnerElectionMode::SingleWinnerMajority
            | WinnerElectionMode::MultiWinnerAllowMultipleWinnersPerRound
            | WinnerElectionMode::MultiPassIrv => {
                let mut winners = by_total_desc(totals, above.into_iter());
                winners.truncate(seats as usize);
                winners
            }
            WinnerElectionMode::MultiWinnerAllowOnlyOneWinnerPerRound => {
                let top = above.iter().map(|c| &totals[c]).max();
                match top {
                    None => Vec::new(),
                    Some(top) => {
                        let tied: Vec<CandidateId> = above
                            .iter()
                            .copied()
                            .filter(|c| &totals[c] == top)
                            .collect();
                        vec![self.tiebreaker.choose(
                            TieDirection::Elect,
                            &tied,
                            &tabulation.rounds,
                            round.round_number,
                        )?]
                    }
                }
            }
            WinnerElectionMode::BottomsUp => Vec::new(),
            WinnerElectionMode::BottomsUpUsingPercentageThreshold => {
                let reached = |t: &Votes| self.model.compare(t, threshold) != Ordering::Less;
                if !totals.is_empty() && totals.values().all(reached) {
                    by_total_desc(totals, totals.keys().copied())
                } else {
                    Vec::new()
                }
            }
        };
        Ok(winners)
    }

    fn select_losers(
        &mut self,
        round: &TabulationRound,
        seats: u32,
        tabulation: &Tabulation,
    ) -> Result<Vec<CandidateId>> {
        let totals = &round.vote_totals;
        let keep = seats.max(1) as usize;
        let max_out = totals.len().saturating_sub(keep);
        if max_out == 0 {
            return Err(non_termination(
                round.round_number,
                "no candidate can be elected or eliminated".to_string(),
                tabulation,
            ));
        }

        if let Some(minimum) = self.rules.minimum_vote_threshold.filter(|m| *m > 0) {
            let minimum = Votes::from_integer(minimum);
            let below: Vec<CandidateId> = totals
                .iter()
                .filter(|(_, t)| **t < minimum)
                .map(|(c, _)| *c)
                .collect();
            if !below.is_empty() && below.len() <= max_out {
                debug!("  {} below minimum vote threshold {}", below.len(), minimum);
                return Ok(below);
            }
        }

        if self.rules.batch_elimination {
            let batch = batch_losers(totals, &round.vote_threshold, max_out);
            if !batch.is_empty() {
                return Ok(batch);
            }
        }

        let lowest = totals.values().min();
        let tied: Vec<CandidateId> = totals
            .iter()
            .filter(|(_, t)| Some(*t) == lowest)
            .map(|(c, _)| *c)
            .collect();
        let loser = self
            .tiebreaker
            .choose(
                TieDirection::Eliminate,
                &tied,
                &tabulation.rounds,
                round.round_number,
            )
            .map_err(|e| self.unresolved_tie(round.round_number, e, tabulation))?;
        Ok(vec![loser])
    }

    /// Scale each winner's ballots down to their surplus fraction, then move
    /// them on. Returns the transfers and the weight the winners keep.
    fn transfer_surplus(
        &self,
        round: &TabulationRound,
        continuing: &CandidateSet,
        tabulation: &mut Tabulation<'e>,
    ) -> Result<(Transfers, Votes)> {
        let n = round.round_number;
        let threshold = &round.vote_threshold;

        for winner in &round.winners {
            let total = &round.vote_totals[winner];
            let ratio = if self.model.compare(total, threshold) != Ordering::Greater {
                Votes::zero()
            } else {
                let surplus = self.model.sub(total, threshold);
                self.model
                    .div(&surplus, total)
                    .map_err(|e| arithmetic(n, e, tabulation))?
            };
            debug!(
                "  surplus ratio for {}: {}",
                self.election.candidate_name(*winner),
                ratio
            );
            let winner = *winner;
            tabulation
                .ballot_set
                .scale_weight(|s| s.current() == Some(winner), &ratio, self.model);
        }

        let remaining = tabulation.ballot_set.tally(&round.winners);
        let before = round
            .winners
            .iter()
            .fold(Votes::zero(), |acc, w| self.model.add(&acc, &round.vote_totals[w]));
        let after: Votes = remaining.values().sum();
        let retained = self.model.sub(&before, &after);

        let from = CandidateSet::from_ids(self.election.candidates.len(), &round.winners);
        let transfers = self.move_ballots(n, &from, continuing, tabulation)?;
        Ok((transfers, retained))
    }

    fn transfer_losers(
        &self,
        round: &TabulationRound,
        continuing: &CandidateSet,
        tabulation: &mut Tabulation<'e>,
    ) -> Result<Transfers> {
        let from = CandidateSet::from_ids(self.election.candidates.len(), &round.losers);
        self.move_ballots(round.round_number, &from, continuing, tabulation)
    }

    fn move_ballots(
        &self,
        round_number: u32,
        from: &CandidateSet,
        continuing: &CandidateSet,
        tabulation: &mut Tabulation<'e>,
    ) -> Result<Transfers> {
        let mut next = continuing.clone();
        for c in from.ids() {
            next.remove(c);
        }
        let policy = self.policy(&next);
        tabulation
            .ballot_set
            .transfer(from, &policy)
            .map_err(|e| non_termination(round_number, e.to_string(), tabulation))
    }

    fn unresolved_tie(&self, round: u32, err: TieError, tabulation: &Tabulation) -> TabulationError {
        TabulationError::TieUnresolved {
            round,
            candidates: err
                .candidates
                .iter()
                .map(|c| self.election.candidate_name(*c).to_string())
                .collect(),
            history: tabulation.rounds.clone(),
        }
    }

    fn names(&self, ids: &[CandidateId]) -> String {
        ids.iter()
            .map(|c| self.election.candidate_name(*c))
            .join(", ")
    }
}

fn arithmetic(round: u32, source: ArithmeticError, tabulation: &Tabulation) -> TabulationError {
    TabulationError::Arithmetic {
        round,
        source,
        history: tabulation.rounds.clone(),
    }
}

fn non_termination(round: u32, detail: String, tabulation: &Tabulation) -> TabulationError {
    TabulationError::NonTermination {
        round,
        detail,
        history: tabulation.rounds.clone(),
    }
}

/// Highest total first; equal totals in roster order.
fn by_total_desc<I>(totals: &BTreeMap<CandidateId, Votes>, candidates: I) -> Vec<CandidateId>
where
    I: Iterator<Item = CandidateId>,
{
    candidates
        .sorted_by(|a, b| totals[b].cmp(&totals[a]).then(a.cmp(b)))
        .collect()
}

/// The largest group of lowest candidates, never splitting candidates with
/// equal totals, whose combined total stays below `threshold`.
fn batch_losers(
    totals: &BTreeMap<CandidateId, Votes>,
    threshold: &Votes,
    max_out: usize,
) -> Vec<CandidateId> {
    let ascending: Vec<(CandidateId, &Votes)> = totals
        .iter()
        .map(|(c, t)| (*c, t))
        .sorted_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(&b.0)))
        .collect();

    let mut losers = Vec::new();
    let mut cumulative = Votes::zero();
    for (_, group) in &ascending.iter().group_by(|(_, t)| *t) {
        let group: Vec<&(CandidateId, &Votes)> = group.collect();
        let mut next = cumulative.clone();
        for (_, t) in &group {
            next += *t;
        }
        if next >= *threshold || losers.len() + group.len() > max_out {
            break;
        }
        cumulative = next;
        losers.extend(group.iter().map(|(c, _)| *c));
    }
    losers
}

fn validate_ballots(election: &Election, rules: &ElectionRules) -> Result<()> {
    let roster_len = election.candidates.len();
    let known = |c: &CandidateId| c.index() < roster_len;

    for ballot in &election.ballots {
        if let Some(limit) = rules.max_rankings_allowed {
            if ballot.choices.len() > limit as usize {
                return Err(TabulationError::DataValidation(format!(
                    "ballot {} has {} rankings, more than the allowed {}",
                    ballot.id,
                    ballot.choices.len(),
                    limit
                )));
            }
        }

        for (rank, choice) in ballot.choices.iter().enumerate() {
            let valid = match choice {
                Choice::Candidate(c) => known(c),
                Choice::Overvote(marks) => {
                    if marks.is_empty()
                        && rules.overvote_rule == OvervoteRule::ExhaustIfMultipleContinuing
                    {
                        return Err(TabulationError::DataValidation(format!(
                            "ballot {} rank {}: overvote without marked candidates cannot be \
                             counted under exhaustIfMultipleContinuing",
                            ballot.id,
                            rank + 1
                        )));
                    }
                    marks.iter().all(|c| known(c))
                }
                Choice::Undervote | Choice::WriteIn => true,
            };
            if !valid {
                return Err(TabulationError::DataValidation(format!(
                    "ballot {} rank {} references a candidate not in the roster",
                    ballot.id,
                    rank + 1
                )));
            }
        }
    }
    Ok(())
}
