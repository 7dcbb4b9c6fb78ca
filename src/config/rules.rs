use super::lenient;
use crate::tabulator::{NumericModel, Votes};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TiebreakMode {
    Random,
    UseCandidateOrder,
    StopCountingAndAsk,
    GeneratePermutation,
    PreviousRoundCountsThenRandom,
}

impl TiebreakMode {
    pub fn needs_seed(self) -> bool {
        match self {
            TiebreakMode::Random
            | TiebreakMode::GeneratePermutation
            | TiebreakMode::PreviousRoundCountsThenRandom => true,
            TiebreakMode::UseCandidateOrder | TiebreakMode::StopCountingAndAsk => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OvervoteRule {
    AlwaysSkipToNextRank,
    ExhaustImmediately,
    ExhaustIfMultipleContinuing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WinnerElectionMode {
    BottomsUp,
    SingleWinnerMajority,
    MultiWinnerAllowMultipleWinnersPerRound,
    MultiWinnerAllowOnlyOneWinnerPerRound,
    MultiPassIrv,
    BottomsUpUsingPercentageThreshold,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("numberOfWinners must be at least 1 for {0:?}")]
    ZeroWinners(WinnerElectionMode),
    #[error("singleWinnerMajority requires numberOfWinners = 1, found {0}")]
    SingleWinnerWithSeats(u32),
    #[error("tiebreak mode {0:?} requires a randomSeed")]
    MissingSeed(TiebreakMode),
    #[error("bottomsUpUsingPercentageThreshold requires multiSeatBottomsUpPercentageThreshold")]
    MissingPercentage,
    #[error("multiSeatBottomsUpPercentageThreshold must be in (0, 100], found {0}")]
    PercentageOutOfRange(Votes),
    #[error("bottomsUpUsingPercentageThreshold elects by share, numberOfWinners must be 0, found {0}")]
    PercentageWithSeats(u32),
    #[error("maxRankingsAllowed must be at least 1")]
    NoRankings,
}

/// Tabulation rules for one contest. Immutable once loaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionRules {
    pub tiebreak_mode: TiebreakMode,
    pub overvote_rule: OvervoteRule,
    pub winner_election_mode: WinnerElectionMode,
    #[serde(default, deserialize_with = "lenient::opt_u64_from_any")]
    pub random_seed: Option<u64>,
    #[serde(deserialize_with = "lenient::u32_from_any")]
    pub number_of_winners: u32,
    /// Percentage (0-100] used only by `bottomsUpUsingPercentageThreshold`.
    #[serde(default, deserialize_with = "lenient::opt_votes_from_any")]
    pub multi_seat_bottoms_up_percentage_threshold: Option<Votes>,
    /// `0` selects exact rational arithmetic.
    #[serde(deserialize_with = "lenient::u32_from_any")]
    pub decimal_places_for_vote_arithmetic: u32,
    #[serde(default, deserialize_with = "lenient::opt_u64_from_any")]
    pub minimum_vote_threshold: Option<u64>,
    /// `None` is unlimited.
    #[serde(deserialize_with = "lenient::skipped_ranks_limit")]
    pub max_skipped_ranks_allowed: Option<u32>,
    /// `None` allows as many rankings as the source data has.
    #[serde(deserialize_with = "lenient::rankings_limit")]
    pub max_rankings_allowed: Option<u32>,
    #[serde(default)]
    pub non_integer_winning_threshold: bool,
    #[serde(default)]
    pub hare_quota: bool,
    #[serde(default)]
    pub batch_elimination: bool,
    #[serde(default)]
    pub exhaust_on_duplicate_candidate: bool,
    #[serde(default)]
    pub rules_description: String,
}

impl Default for ElectionRules {
    fn default() -> Self {
        ElectionRules {
            tiebreak_mode: TiebreakMode::UseCandidateOrder,
            overvote_rule: OvervoteRule::AlwaysSkipToNextRank,
            winner_election_mode: WinnerElectionMode::SingleWinnerMajority,
            random_seed: None,
            number_of_winners: 1,
            multi_seat_bottoms_up_percentage_threshold: None,
            decimal_places_for_vote_arithmetic: 4,
            minimum_vote_threshold: None,
            max_skipped_ranks_allowed: None,
            max_rankings_allowed: None,
            non_integer_winning_threshold: false,
            hare_quota: false,
            batch_elimination: false,
            exhaust_on_duplicate_candidate: false,
            rules_description: String::new(),
        }
    }
}

impl ElectionRules {
    pub fn numeric_model(&self) -> NumericModel {
        NumericModel::from_decimal_places(self.decimal_places_for_vote_arithmetic)
    }

    /// Number of rank columns to read from a table `width` columns wide.
    pub fn rankings_to_read(&self, width: usize) -> usize {
        match self.max_rankings_allowed {
            Some(limit) => width.min(limit as usize),
            None => width,
        }
    }

    /// The percentage threshold as a fraction of one.
    pub fn percentage_share(&self) -> Option<Votes> {
        self.multi_seat_bottoms_up_percentage_threshold
            .as_ref()
            .map(|p| NumericModel::Exact.mul(p, &Votes::from_ratio(1, 100)))
    }

    /// Reject contradictory or incomplete rule combinations.
    pub fn validate(&self) -> Result<(), RulesError> {
        use WinnerElectionMode::*;

        match self.winner_election_mode {
            SingleWinnerMajority => {
                if self.number_of_winners != 1 {
                    return Err(RulesError::SingleWinnerWithSeats(self.number_of_winners));
                }
            }
            BottomsUpUsingPercentageThreshold => {
                if self.number_of_winners != 0 {
                    return Err(RulesError::PercentageWithSeats(self.number_of_winners));
                }
                let pct = self
                    .multi_seat_bottoms_up_percentage_threshold
                    .as_ref()
                    .ok_or(RulesError::MissingPercentage)?;
                if pct.is_zero() || *pct > Votes::from_integer(100) {
                    return Err(RulesError::PercentageOutOfRange(pct.clone()));
                }
            }
            BottomsUp
            | MultiWinnerAllowMultipleWinnersPerRound
            | MultiWinnerAllowOnlyOneWinnerPerRound
            | MultiPassIrv => {
                if self.number_of_winners == 0 {
                    return Err(RulesError::ZeroWinners(self.winner_election_mode));
                }
            }
        }

        if self.tiebreak_mode.needs_seed() && self.random_seed.is_none() {
            return Err(RulesError::MissingSeed(self.tiebreak_mode));
        }

        if self.max_rankings_allowed == Some(0) {
            return Err(RulesError::NoRankings);
        }

        Ok(())
    }
}
