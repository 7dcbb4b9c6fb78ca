//! Choosing one candidate out of several with equal totals.

use super::tabulation::TabulationRound;
use crate::config::TiebreakMode;
use crate::model::election::CandidateId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieDirection {
    /// Pick the candidate to eliminate.
    Eliminate,
    /// Pick the candidate to elect.
    Elect,
}

/// Supplies a human decision for `stopCountingAndAsk`.
pub trait TieResolver {
    /// Return one of `tied`, or `None` to abandon the count.
    fn resolve(
        &mut self,
        direction: TieDirection,
        round: u32,
        tied: &[CandidateId],
    ) -> Option<CandidateId>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tie between {candidates:?} was not resolved")]
pub struct TieError {
    pub candidates: Vec<CandidateId>,
}

pub struct Tiebreaker {
    mode: TiebreakMode,
    rng: Option<StdRng>,
    /// Position of each candidate in the seeded permutation.
    permutation: HashMap<CandidateId, usize>,
    resolver: Option<Box<dyn TieResolver>>,
}

impl std::fmt::Debug for Tiebreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tiebreaker")
            .field("mode", &self.mode)
            .field("seeded", &self.rng.is_some())
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

impl Tiebreaker {
    pub fn new(mode: TiebreakMode, seed: Option<u64>, roster: &[CandidateId]) -> Tiebreaker {
        let mut rng = seed.map(StdRng::seed_from_u64);

        let mut permutation = HashMap::new();
        if let (TiebreakMode::GeneratePermutation, Some(rng)) = (mode, rng.as_mut()) {
            let mut order = roster.to_vec();
            order.shuffle(rng);
            info!("tiebreak permutation: {:?}", order);
            permutation = order.into_iter().enumerate().map(|(i, c)| (c, i)).collect();
        }

        Tiebreaker {
            mode,
            rng,
            permutation,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Box<dyn TieResolver>) -> Tiebreaker {
        self.resolver = Some(resolver);
        self
    }

    /// Pick one of `tied`. `history` holds the rounds before the current one.
    pub fn choose(
        &mut self,
        direction: TieDirection,
        tied: &[CandidateId],
        history: &[TabulationRound],
        round: u32,
    ) -> Result<CandidateId, TieError> {
        let mut tied = tied.to_vec();
        tied.sort();
        tied.dedup();
        let unresolved = |candidates: &[CandidateId]| TieError {
            candidates: candidates.to_vec(),
        };

        match tied.len() {
            0 => return Err(unresolved(&tied)),
            1 => return Ok(tied[0]),
            _ => {}
        }

        let chosen = match self.mode {
            TiebreakMode::UseCandidateOrder => Some(by_order(direction, &tied, |c| c.index())),
            TiebreakMode::GeneratePermutation => {
                let permutation = &self.permutation;
                Some(by_order(direction, &tied, |c| {
                    permutation.get(&c).copied().unwrap_or(usize::MAX)
                }))
            }
            TiebreakMode::Random => self.draw(&tied),
            TiebreakMode::PreviousRoundCountsThenRandom => {
                let narrowed = by_previous_rounds(direction, &tied, history);
                if narrowed.len() == 1 {
                    Some(narrowed[0])
                } else {
                    self.draw(&narrowed)
                }
            }
            TiebreakMode::StopCountingAndAsk => match self.resolver.as_mut() {
                Some(resolver) => resolver
                    .resolve(direction, round, &tied)
                    .filter(|c| tied.contains(c)),
                None => None,
            },
        };

        let chosen = chosen.ok_or_else(|| unresolved(&tied))?;
        info!(
            "round {}: tie between {:?} resolved by {:?} -> {}",
            round, tied, self.mode, chosen
        );
        Ok(chosen)
    }

    fn draw(&mut self, tied: &[CandidateId]) -> Option<CandidateId> {
        let rng = self.rng.as_mut()?;
        let i = rng.random_range(0..tied.len());
        Some(tied[i])
    }
}

/// Earliest in order is elected, latest is eliminated.
fn by_order<F>(direction: TieDirection, tied: &[CandidateId], position: F) -> CandidateId
where
    F: Fn(CandidateId) -> usize,
{
    let mut ordered = tied.to_vec();
    ordered.sort_by_key(|c| position(*c));
    match direction {
        TieDirection::Elect => ordered[0],
        TieDirection::Eliminate => ordered[ordered.len() - 1],
    }
}

/// Walk back through earlier rounds, keeping only the candidates at the
/// relevant extreme, until one remains or history runs out.
fn by_previous_rounds(
    direction: TieDirection,
    tied: &[CandidateId],
    history: &[TabulationRound],
) -> Vec<CandidateId> {
    let mut remaining = tied.to_vec();
    for round in history.iter().rev() {
        let totals: Option<Vec<_>> = remaining
            .iter()
            .map(|c| round.total_for(*c).map(|t| (*c, t)))
            .collect();
        let totals = match totals {
            Some(totals) => totals,
            None => break,
        };

        let extreme = match direction {
            TieDirection::Eliminate => totals.iter().map(|(_, t)| *t).min(),
            TieDirection::Elect => totals.iter().map(|(_, t)| *t).max(),
        };
        if let Some(extreme) = extreme {
            remaining = totals
                .iter()
                .filter(|(_, t)| *t == extreme)
                .map(|(c, _)| *c)
                .collect();
        }
        if remaining.len() == 1 {
            break;
        }
    }
    remaining
}
