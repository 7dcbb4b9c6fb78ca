//! Shared builders for contest fixtures.

#![allow(dead_code)]

use rcv_tabulator::config::ElectionRules;
use rcv_tabulator::model::election::{Ballot, Candidate, CandidateId, Choice, Election};

/// A roster of single-letter candidates and ballots written as `"A B C"`,
/// each repeated `count` times.
pub fn election(names: &str, ballots: &[(&str, usize)]) -> Election {
    let roster: Vec<Candidate> = names
        .split_whitespace()
        .map(|n| Candidate::new(n.to_string()))
        .collect();
    let lookup = Election::new(roster.clone(), vec![]);

    let mut cast = Vec::new();
    for (ranking, count) in ballots {
        let choices: Vec<Choice> = ranking
            .split_whitespace()
            .map(|label| match label {
                "_" => Choice::Undervote,
                "?" => Choice::WriteIn,
                _ if label.contains('|') => Choice::Overvote(
                    label.split('|').map(|l| id(&lookup, l)).collect(),
                ),
                _ => Choice::Candidate(id(&lookup, label)),
            })
            .collect();
        for _ in 0..*count {
            cast.push(Ballot::new(format!("b{}", cast.len() + 1), choices.clone()));
        }
    }
    Election::new(roster, cast)
}

pub fn id(election: &Election, name: &str) -> CandidateId {
    election
        .find(name)
        .unwrap_or_else(|| panic!("no candidate {}", name))
}

pub fn names(election: &Election, ids: &[CandidateId]) -> Vec<String> {
    ids.iter()
        .map(|c| election.candidate_name(*c).to_string())
        .collect()
}

/// Exact arithmetic with a non-integer threshold.
pub fn exact_rules() -> ElectionRules {
    ElectionRules {
        decimal_places_for_vote_arithmetic: 0,
        non_integer_winning_threshold: true,
        ..ElectionRules::default()
    }
}
