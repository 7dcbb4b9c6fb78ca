//! Round-based ranked-choice tabulation.
//!
//! [`RoundEngine`] drives a [`BallotSet`] through rounds of settlement,
//! tallying, winner or loser selection and vote transfer, recording each
//! [`TabulationRound`] into a [`Tabulation`].

pub mod ballot_set;
pub mod engine;
pub mod numeric;
pub mod quota;
pub mod tabulation;
pub mod tiebreak;

pub use ballot_set::{BallotSet, BallotState, Position, SettlePolicy};
pub use engine::RoundEngine;
pub use numeric::{ArithmeticError, NumericModel, Votes};
pub use quota::{QuotaCalculator, QuotaRule};
pub use tabulation::{CandidateSet, Destination, Tabulation, TabulationRound, Transfers};
pub use tiebreak::{TieDirection, TieResolver, Tiebreaker};

use crate::config::ElectionRules;
use crate::model::election::Election;

#[derive(Debug, thiserror::Error)]
pub enum TabulationError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Data validation error: {0}")]
    DataValidation(String),
    #[error("Arithmetic error in round {round}: {source}")]
    Arithmetic {
        round: u32,
        source: ArithmeticError,
        history: Vec<TabulationRound>,
    },
    #[error("Tabulation did not terminate in round {round}: {detail}")]
    NonTermination {
        round: u32,
        detail: String,
        history: Vec<TabulationRound>,
    },
    #[error("Tie in round {round} between {} was not resolved", candidates.join(", "))]
    TieUnresolved {
        round: u32,
        candidates: Vec<String>,
        history: Vec<TabulationRound>,
    },
}

impl TabulationError {
    /// Rounds completed before a fatal error. Empty for errors raised
    /// before the first round.
    pub fn history(&self) -> &[TabulationRound] {
        match self {
            TabulationError::Configuration(_) | TabulationError::DataValidation(_) => &[],
            TabulationError::Arithmetic { history, .. }
            | TabulationError::NonTermination { history, .. }
            | TabulationError::TieUnresolved { history, .. } => history,
        }
    }
}

pub type Result<T> = std::result::Result<T, TabulationError>;

/// Validate and tabulate in one call.
pub fn tabulate<'e>(election: &'e Election, rules: &'e ElectionRules) -> Result<Tabulation<'e>> {
    RoundEngine::new(election, rules)?.tabulate()
}
