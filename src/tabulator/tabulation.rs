use super::ballot_set::BallotSet;
use super::numeric::Votes;
use crate::model::election::CandidateId;
use std::collections::BTreeMap;

/// Membership flags indexed by [`CandidateId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    members: Vec<bool>,
}

impl CandidateSet {
    pub fn empty(roster_len: usize) -> CandidateSet {
        CandidateSet {
            members: vec![false; roster_len],
        }
    }

    pub fn from_ids(roster_len: usize, ids: &[CandidateId]) -> CandidateSet {
        let mut set = CandidateSet::empty(roster_len);
        for id in ids {
            set.insert(*id);
        }
        set
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.members.get(id.index()).copied().unwrap_or(false)
    }

    pub fn insert(&mut self, id: CandidateId) {
        if let Some(slot) = self.members.get_mut(id.index()) {
            *slot = true;
        }
    }

    pub fn remove(&mut self, id: CandidateId) {
        if let Some(slot) = self.members.get_mut(id.index()) {
            *slot = false;
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = CandidateId> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, member)| **member)
            .map(|(i, _)| CandidateId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.members.iter().filter(|m| **m).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a transferred ballot ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Destination {
    Candidate(CandidateId),
    Exhausted,
}

/// Weight moved in one round, keyed by source candidate then destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transfers {
    moved: BTreeMap<CandidateId, BTreeMap<Destination, Votes>>,
}

impl Transfers {
    pub fn new() -> Transfers {
        Transfers::default()
    }

    pub fn add(&mut self, source: CandidateId, destination: Destination, weight: &Votes) {
        *self
            .moved
            .entry(source)
            .or_default()
            .entry(destination)
            .or_insert_with(Votes::zero) += weight;
    }

    pub fn get(&self, source: CandidateId, destination: Destination) -> Option<&Votes> {
        self.moved.get(&source).and_then(|d| d.get(&destination))
    }

    /// Outbound transfers of one source, possibly empty.
    pub fn from_source(&self, source: CandidateId) -> impl Iterator<Item = (&Destination, &Votes)> {
        self.moved.get(&source).into_iter().flat_map(|d| d.iter())
    }

    pub fn total_from(&self, source: CandidateId) -> Votes {
        self.from_source(source).map(|(_, w)| w).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabulationRound {
    /// 1-based, increasing across the whole run.
    pub round_number: u32,
    /// 1 except under multi-pass IRV.
    pub pass: u32,
    pub vote_threshold: Votes,
    /// Every contending candidate, zeros included.
    pub vote_totals: BTreeMap<CandidateId, Votes>,
    pub winners: Vec<CandidateId>,
    pub losers: Vec<CandidateId>,
    pub transfers: Transfers,
    /// Weight of exhausted ballots when the round was tallied.
    pub exhausted: Votes,
    /// Weight kept by this round's winners and removed from circulation.
    pub retained: Votes,
}

impl TabulationRound {
    pub fn continuing_total(&self) -> Votes {
        self.vote_totals.values().sum()
    }

    pub fn total_for(&self, candidate: CandidateId) -> Option<&Votes> {
        self.vote_totals.get(&candidate)
    }
}

/// The state of one tabulation run.
#[derive(Debug, Clone)]
pub struct Tabulation<'a> {
    pub ballot_set: BallotSet<'a>,
    pub winners: Vec<CandidateId>,
    /// Eliminated in the current pass.
    pub losers: Vec<CandidateId>,
    pub rounds: Vec<TabulationRound>,
    pub pass: u32,
}

impl<'a> Tabulation<'a> {
    pub fn new(ballot_set: BallotSet<'a>) -> Tabulation<'a> {
        Tabulation {
            ballot_set,
            winners: Vec::new(),
            losers: Vec::new(),
            rounds: Vec::new(),
            pass: 1,
        }
    }

    /// Start another multi-pass IRV count over fresh ballot state. Earlier
    /// winners stay elected; eliminations are forgotten.
    pub fn begin_pass(&mut self, ballot_set: BallotSet<'a>) {
        self.ballot_set = ballot_set;
        self.losers.clear();
        self.pass += 1;
    }

    pub fn record(&mut self, round: TabulationRound) {
        debug_assert!(round.winners.is_empty() || round.losers.is_empty());
        self.winners.extend(round.winners.iter().copied());
        self.losers.extend(round.losers.iter().copied());
        debug_assert!(self.winners.iter().all(|w| !self.losers.contains(w)));
        self.rounds.push(round);
    }
}
