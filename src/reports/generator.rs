use super::{ContestSummary, RoundResult, SummaryConfig, TallyResult};
use crate::config::OutputSettings;
use crate::model::election::{CandidateId, Election};
use crate::tabulator::{Destination, NumericModel, TabulationRound, Transfers, Votes};
use std::collections::BTreeMap;

const EXHAUSTED: &str = "exhausted";

/// Digits kept for values with no finite decimal expansion, such as exact
/// thirds. Matches the default `decimalPlacesForVoteArithmetic`.
const REPEATING_PLACES: u32 = 4;

/// Summary values are always plain decimals; repeating fractions are
/// truncated to [`REPEATING_PLACES`].
fn decimal(votes: &Votes) -> String {
    votes.to_decimal_string().unwrap_or_else(|| {
        NumericModel::FixedPoint {
            places: REPEATING_PLACES,
        }
        .truncate(votes.clone())
        .to_string()
    })
}

/// Build the published summary for a finished tabulation.
pub fn generate_summary(
    election: &Election,
    rounds: &[TabulationRound],
    output: &OutputSettings,
) -> ContestSummary {
    let threshold = rounds
        .last()
        .map(|r| decimal(&r.vote_threshold))
        .unwrap_or_default();
    let date = output
        .date()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| output.contest_date.clone());

    ContestSummary {
        config: SummaryConfig {
            contest: output.contest_name.clone(),
            date,
            jurisdiction: output.contest_jurisdiction.clone(),
            office: output.contest_office.clone(),
            threshold,
        },
        results: rounds.iter().map(|r| round_result(election, r)).collect(),
    }
}

fn round_result(election: &Election, round: &TabulationRound) -> RoundResult {
    let tally = round
        .vote_totals
        .iter()
        .map(|(c, v)| (election.candidate_name(*c).to_string(), decimal(v)))
        .collect();

    let elected = round.winners.iter().map(|w| TallyResult::Elected {
        elected: election.candidate_name(*w).to_string(),
        transfers: transfer_map(election, &round.transfers, *w),
    });
    let eliminated = round.losers.iter().map(|l| TallyResult::Eliminated {
        eliminated: election.candidate_name(*l).to_string(),
        transfers: transfer_map(election, &round.transfers, *l),
    });

    RoundResult {
        round: round.round_number,
        tally,
        tally_results: elected.chain(eliminated).collect(),
    }
}

fn transfer_map(
    election: &Election,
    transfers: &Transfers,
    source: CandidateId,
) -> BTreeMap<String, String> {
    transfers
        .from_source(source)
        .filter(|(_, weight)| !weight.is_zero())
        .map(|(destination, weight)| {
            let key = match destination {
                Destination::Candidate(c) => election.candidate_name(*c).to_string(),
                Destination::Exhausted => EXHAUSTED.to_string(),
            };
            (key, decimal(weight))
        })
        .collect()
}
