mod support;

use rcv_tabulator::config::{ElectionRules, OvervoteRule, TiebreakMode, WinnerElectionMode};
use rcv_tabulator::model::election::{Ballot, Candidate, CandidateId, Choice, Election};
use rcv_tabulator::tabulator::{
    tabulate, Destination, RoundEngine, TabulationError, TieDirection, TieResolver, Votes,
};
use support::{election, exact_rules, id, names};

fn v(n: u64) -> Votes {
    Votes::from_integer(n)
}

fn abc() -> Election {
    election("A B C", &[("A B C", 10), ("B A C", 8), ("C A B", 3)])
}

#[test]
fn three_candidates_with_non_integer_threshold() {
    let e = abc();
    let rules = ElectionRules {
        non_integer_winning_threshold: true,
        ..ElectionRules::default()
    };
    let result = tabulate(&e, &rules).unwrap();

    assert_eq!(result.rounds.len(), 2);
    let first = &result.rounds[0];
    assert_eq!(first.vote_threshold, Votes::from_ratio(21, 2));
    assert_eq!(first.total_for(id(&e, "A")), Some(&v(10)));
    assert_eq!(first.total_for(id(&e, "B")), Some(&v(8)));
    assert_eq!(first.total_for(id(&e, "C")), Some(&v(3)));
    assert!(first.winners.is_empty());
    assert_eq!(names(&e, &first.losers), vec!["C"]);
    assert_eq!(
        first
            .transfers
            .get(id(&e, "C"), Destination::Candidate(id(&e, "A"))),
        Some(&v(3))
    );

    let second = &result.rounds[1];
    assert_eq!(second.vote_threshold, Votes::from_ratio(21, 2));
    assert_eq!(second.total_for(id(&e, "A")), Some(&v(13)));
    assert_eq!(second.total_for(id(&e, "B")), Some(&v(8)));
    assert_eq!(names(&e, &second.winners), vec!["A"]);
    assert_eq!(names(&e, &result.winners), vec!["A"]);
}

#[test]
fn three_candidates_with_rounded_threshold() {
    let e = abc();
    let rules = ElectionRules::default();
    let result = tabulate(&e, &rules).unwrap();
    assert_eq!(result.rounds[0].vote_threshold, v(11));
    assert_eq!(result.rounds.len(), 2);
    assert_eq!(names(&e, &result.winners), vec!["A"]);
}

#[test]
fn total_equal_to_threshold_does_not_win() {
    let e = election("A B C", &[("A", 5), ("B", 3), ("C B", 2)]);
    let rules = exact_rules();
    let result = tabulate(&e, &rules).unwrap();

    let first = &result.rounds[0];
    assert_eq!(first.vote_threshold, v(5));
    assert_eq!(first.total_for(id(&e, "A")), Some(&v(5)));
    assert!(first.winners.is_empty());
    assert_eq!(names(&e, &first.losers), vec!["C"]);

    // A and B tie at the threshold; roster order eliminates B.
    let second = &result.rounds[1];
    assert!(second.winners.is_empty());
    assert_eq!(names(&e, &second.losers), vec!["B"]);
    assert_eq!(names(&e, &result.winners), vec!["A"]);
}

#[test]
fn exhausted_ballots_leave_later_tallies() {
    let e = election("A B C", &[("A", 5), ("B", 4), ("C", 2)]);
    let rules = exact_rules();
    let result = tabulate(&e, &rules).unwrap();

    let second = &result.rounds[1];
    assert_eq!(result.rounds[0].exhausted, Votes::zero());
    assert_eq!(
        result.rounds[0]
            .transfers
            .get(id(&e, "C"), Destination::Exhausted),
        Some(&v(2))
    );
    assert_eq!(second.exhausted, v(2));
    assert_eq!(second.continuing_total(), v(9));
    assert_eq!(second.vote_threshold, Votes::from_ratio(9, 2));
    assert_eq!(names(&e, &second.winners), vec!["A"]);
}

#[test]
fn surplus_moves_at_fractional_weight() {
    let e = election("A B C D", &[("A B", 6), ("B", 2), ("C", 3), ("D", 1)]);
    let rules = ElectionRules {
        winner_election_mode: WinnerElectionMode::MultiWinnerAllowMultipleWinnersPerRound,
        number_of_winners: 2,
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();

    let first = &result.rounds[0];
    assert_eq!(first.vote_threshold, v(4));
    assert_eq!(names(&e, &first.winners), vec!["A"]);
    assert_eq!(
        first
            .transfers
            .get(id(&e, "A"), Destination::Candidate(id(&e, "B"))),
        Some(&v(2))
    );
    assert_eq!(first.retained, v(4));

    let second = &result.rounds[1];
    assert_eq!(second.total_for(id(&e, "B")), Some(&v(4)));
    assert_eq!(second.vote_threshold, v(4));
    assert_eq!(names(&e, &second.losers), vec!["D"]);

    assert_eq!(names(&e, &result.winners), vec!["A", "B"]);
    assert_eq!(result.rounds.len(), 3);
}

#[test]
fn surplus_is_truncated_under_fixed_point() {
    let e = election("A B C", &[("A B", 2), ("A C", 1), ("B", 1), ("C", 1)]);
    let rules = ElectionRules {
        winner_election_mode: WinnerElectionMode::MultiWinnerAllowMultipleWinnersPerRound,
        number_of_winners: 2,
        decimal_places_for_vote_arithmetic: 2,
        non_integer_winning_threshold: true,
        ..ElectionRules::default()
    };
    let result = tabulate(&e, &rules).unwrap();

    // Threshold 5/3 truncates to 1.66; A's ratio (3 - 1.66) / 3 to 0.44.
    let first = &result.rounds[0];
    assert_eq!(first.vote_threshold.to_string(), "1.66");
    let a = id(&e, "A");
    assert_eq!(
        first.transfers.get(a, Destination::Candidate(id(&e, "B"))),
        Some(&"0.88".parse::<Votes>().unwrap())
    );
    assert_eq!(first.retained.to_string(), "1.68");
}

#[test]
fn batch_elimination_drops_every_hopeless_candidate() {
    let e = election(
        "A B C D E",
        &[("A", 10), ("B", 6), ("C", 2), ("D", 1), ("E", 1)],
    );
    let rules = ElectionRules {
        batch_elimination: true,
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();

    let mut losers = names(&e, &result.rounds[0].losers);
    losers.sort();
    assert_eq!(losers, vec!["C", "D", "E"]);
    assert_eq!(names(&e, &result.rounds[1].winners), vec!["A"]);
}

#[test]
fn minimum_vote_threshold_eliminates_first() {
    let e = election("A B C D", &[("A", 10), ("B", 8), ("C", 2), ("D", 1)]);
    let rules = ElectionRules {
        minimum_vote_threshold: Some(3),
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();
    assert_eq!(names(&e, &result.rounds[0].losers), vec!["C", "D"]);
}

#[test]
fn bottoms_up_fills_seats_by_elimination() {
    let e = election("A B C D", &[("A", 5), ("B", 4), ("C", 3), ("D", 2)]);
    let rules = ElectionRules {
        winner_election_mode: WinnerElectionMode::BottomsUp,
        number_of_winners: 2,
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();

    assert_eq!(result.rounds.len(), 3);
    assert_eq!(names(&e, &result.rounds[0].losers), vec!["D"]);
    assert_eq!(names(&e, &result.rounds[1].losers), vec!["C"]);
    assert_eq!(names(&e, &result.rounds[2].winners), vec!["A", "B"]);
}

#[test]
fn bottoms_up_percentage_elects_everyone_above_share() {
    let e = election(
        "A B C D E",
        &[("A", 5), ("B", 4), ("C", 3), ("D", 2), ("E", 1)],
    );
    let rules = ElectionRules {
        winner_election_mode: WinnerElectionMode::BottomsUpUsingPercentageThreshold,
        number_of_winners: 0,
        multi_seat_bottoms_up_percentage_threshold: Some(v(25)),
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();

    assert_eq!(result.rounds[0].vote_threshold, Votes::from_ratio(15, 4));
    assert_eq!(names(&e, &result.rounds[0].losers), vec!["E"]);
    assert_eq!(names(&e, &result.rounds[1].losers), vec!["D"]);
    let last = &result.rounds[2];
    assert_eq!(last.vote_threshold, v(3));
    assert_eq!(names(&e, &last.winners), vec!["A", "B", "C"]);
}

#[test]
fn bottoms_up_percentage_eliminates_down_to_a_single_winner() {
    let e = election("A B C", &[("A", 95), ("B", 4), ("C", 1)]);
    let rules = ElectionRules {
        winner_election_mode: WinnerElectionMode::BottomsUpUsingPercentageThreshold,
        number_of_winners: 0,
        multi_seat_bottoms_up_percentage_threshold: Some(v(10)),
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();

    assert_eq!(result.rounds.len(), 3);
    assert_eq!(names(&e, &result.rounds[0].losers), vec!["C"]);
    assert_eq!(names(&e, &result.rounds[1].losers), vec!["B"]);
    assert_eq!(result.rounds[1].vote_threshold, Votes::from_ratio(99, 10));
    assert_eq!(names(&e, &result.winners), vec!["A"]);
}

#[test]
fn bottoms_up_percentage_rejects_a_seat_count() {
    let e = election("A B C", &[("A", 95), ("B", 4), ("C", 1)]);
    let rules = ElectionRules {
        winner_election_mode: WinnerElectionMode::BottomsUpUsingPercentageThreshold,
        number_of_winners: 3,
        multi_seat_bottoms_up_percentage_threshold: Some(v(10)),
        ..exact_rules()
    };
    let err = tabulate(&e, &rules).unwrap_err();
    assert!(matches!(err, TabulationError::Configuration(_)));
    assert!(err.history().is_empty());
}

#[test]
fn multi_pass_irv_restarts_each_pass() {
    let e = election("A B C", &[("A B", 6), ("B A", 5), ("C B", 4)]);
    let rules = ElectionRules {
        winner_election_mode: WinnerElectionMode::MultiPassIrv,
        number_of_winners: 2,
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();

    assert_eq!(names(&e, &result.winners), vec!["B", "A"]);
    let numbers: Vec<u32> = result.rounds.iter().map(|r| r.round_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    let passes: Vec<u32> = result.rounds.iter().map(|r| r.pass).collect();
    assert_eq!(passes, vec![1, 1, 2]);

    // The second pass counts every ballot afresh, C included.
    let third = &result.rounds[2];
    assert_eq!(third.total_for(id(&e, "A")), Some(&v(11)));
    assert_eq!(third.total_for(id(&e, "C")), Some(&v(4)));
    assert_eq!(third.total_for(id(&e, "B")), None);
}

#[test]
fn hare_quota_is_larger_than_droop() {
    let e = election("A B C D", &[("A", 7), ("B", 5), ("C", 4), ("D", 4)]);
    let droop = ElectionRules {
        winner_election_mode: WinnerElectionMode::MultiWinnerAllowMultipleWinnersPerRound,
        number_of_winners: 2,
        ..exact_rules()
    };
    let hare = ElectionRules {
        hare_quota: true,
        ..droop.clone()
    };

    let with_droop = tabulate(&e, &droop).unwrap();
    assert_eq!(with_droop.rounds[0].vote_threshold, Votes::from_ratio(20, 3));
    assert_eq!(names(&e, &with_droop.rounds[0].winners), vec!["A"]);

    let with_hare = tabulate(&e, &hare).unwrap();
    assert_eq!(with_hare.rounds[0].vote_threshold, v(10));
    assert!(with_hare.rounds[0].winners.is_empty());
    assert_eq!(names(&e, &with_hare.rounds[0].losers), vec!["D"]);
    assert_eq!(names(&e, &with_hare.winners), vec!["A", "B"]);
}

#[test]
fn only_one_winner_per_round() {
    let e = election("A B C", &[("A C", 5), ("B C", 5), ("C", 1)]);
    let rules = ElectionRules {
        winner_election_mode: WinnerElectionMode::MultiWinnerAllowOnlyOneWinnerPerRound,
        number_of_winners: 2,
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();

    // A and B both exceed 11/3; the tie for most votes goes to roster order.
    assert_eq!(names(&e, &result.rounds[0].winners), vec!["A"]);
    assert_eq!(names(&e, &result.winners), vec!["A", "B"]);
}

#[test]
fn excluded_candidates_are_skipped() {
    let mut e = election("A B C", &[("A B", 5), ("B", 3), ("C", 4)]);
    e.candidates[0].excluded = true;
    let rules = exact_rules();
    let result = tabulate(&e, &rules).unwrap();

    let first = &result.rounds[0];
    assert_eq!(first.total_for(id(&e, "A")), None);
    assert_eq!(first.total_for(id(&e, "B")), Some(&v(8)));
    assert_eq!(names(&e, &result.winners), vec!["B"]);
}

#[test]
fn overvote_rules_change_the_count() {
    let e = election("A B C", &[("A|B C", 3), ("A", 4), ("B", 3)]);

    let rules = exact_rules();
    let skip = tabulate(&e, &rules).unwrap();
    assert_eq!(skip.rounds[0].total_for(id(&e, "C")), Some(&v(3)));

    let exhaust = ElectionRules {
        overvote_rule: OvervoteRule::ExhaustImmediately,
        ..exact_rules()
    };
    let result = tabulate(&e, &exhaust).unwrap();
    assert_eq!(result.rounds[0].exhausted, v(3));
    assert_eq!(result.rounds[0].total_for(id(&e, "C")), Some(&v(0)));
}

#[test]
fn skipped_rank_limit_exhausts() {
    let e = election("A B", &[("_ _ A", 2), ("_ B", 3), ("A", 2)]);
    let rules = ElectionRules {
        max_skipped_ranks_allowed: Some(1),
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();
    assert_eq!(result.rounds[0].exhausted, v(2));
    assert_eq!(result.rounds[0].total_for(id(&e, "B")), Some(&v(3)));
}

#[test]
fn seeded_random_tiebreak_is_reproducible() {
    let e = election("A B C", &[("A", 4), ("B", 3), ("C", 3)]);
    let rules = ElectionRules {
        tiebreak_mode: TiebreakMode::Random,
        random_seed: Some(42),
        ..exact_rules()
    };
    let first = tabulate(&e, &rules).unwrap();
    let second = tabulate(&e, &rules).unwrap();
    assert_eq!(first.rounds, second.rounds);
    let loser = &first.rounds[0].losers;
    assert!(loser == &vec![id(&e, "B")] || loser == &vec![id(&e, "C")]);
}

#[test]
fn previous_round_counts_break_ties() {
    // B and C tie in round 2; B had more in round 1.
    let e = election(
        "A B C D",
        &[("A", 8), ("B", 4), ("C", 3), ("D C", 1)],
    );
    let rules = ElectionRules {
        tiebreak_mode: TiebreakMode::PreviousRoundCountsThenRandom,
        random_seed: Some(1),
        ..exact_rules()
    };
    let result = tabulate(&e, &rules).unwrap();
    assert_eq!(names(&e, &result.rounds[0].losers), vec!["D"]);
    assert_eq!(names(&e, &result.rounds[1].losers), vec!["C"]);
}

#[test]
fn stop_counting_without_resolver_keeps_history() {
    let e = election("A B C D", &[("A", 6), ("B", 4), ("C", 4), ("D", 1)]);
    let rules = ElectionRules {
        tiebreak_mode: TiebreakMode::StopCountingAndAsk,
        ..exact_rules()
    };
    match tabulate(&e, &rules) {
        Err(TabulationError::TieUnresolved {
            round,
            candidates,
            history,
        }) => {
            assert_eq!(round, 2);
            assert_eq!(candidates, vec!["B", "C"]);
            assert_eq!(history.len(), 1);
        }
        other => panic!("expected an unresolved tie, got {:?}", other.map(|t| t.rounds)),
    }
}

struct PickFirst;

impl TieResolver for PickFirst {
    fn resolve(&mut self, _: TieDirection, _: u32, tied: &[CandidateId]) -> Option<CandidateId> {
        tied.first().copied()
    }
}

#[test]
fn stop_counting_with_resolver_continues() {
    let e = election("A B C D", &[("A", 6), ("B", 4), ("C", 4), ("D", 1)]);
    let rules = ElectionRules {
        tiebreak_mode: TiebreakMode::StopCountingAndAsk,
        ..exact_rules()
    };
    let result = RoundEngine::new(&e, &rules)
        .unwrap()
        .with_tie_resolver(Box::new(PickFirst))
        .tabulate()
        .unwrap();
    assert_eq!(names(&e, &result.rounds[1].losers), vec!["B"]);
}

#[test]
fn unknown_candidate_is_a_data_error() {
    let e = Election::new(
        vec![Candidate::new("A".into())],
        vec![Ballot::new("x".into(), vec![Choice::Candidate(CandidateId(7))])],
    );
    assert!(matches!(
        tabulate(&e, &exact_rules()),
        Err(TabulationError::DataValidation(_))
    ));
}

#[test]
fn too_many_rankings_is_a_data_error() {
    let e = election("A B C", &[("A B C", 1)]);
    let rules = ElectionRules {
        max_rankings_allowed: Some(2),
        ..exact_rules()
    };
    assert!(matches!(
        tabulate(&e, &rules),
        Err(TabulationError::DataValidation(_))
    ));
}

#[test]
fn unlabelled_overvote_cannot_use_multiple_continuing_rule() {
    let e = Election::new(
        vec![Candidate::new("A".into()), Candidate::new("B".into())],
        vec![Ballot::new("x".into(), vec![Choice::Overvote(vec![])])],
    );
    let rules = ElectionRules {
        overvote_rule: OvervoteRule::ExhaustIfMultipleContinuing,
        ..exact_rules()
    };
    assert!(matches!(
        tabulate(&e, &rules),
        Err(TabulationError::DataValidation(_))
    ));
}

#[test]
fn configuration_errors_come_before_round_one() {
    let e = election("A B", &[("A", 1)]);

    let zero_seats = ElectionRules {
        winner_election_mode: WinnerElectionMode::BottomsUp,
        number_of_winners: 0,
        ..exact_rules()
    };
    let err = tabulate(&e, &zero_seats).unwrap_err();
    assert!(matches!(err, TabulationError::Configuration(_)));
    assert!(err.history().is_empty());

    let too_many_seats = ElectionRules {
        winner_election_mode: WinnerElectionMode::MultiWinnerAllowMultipleWinnersPerRound,
        number_of_winners: 3,
        ..exact_rules()
    };
    assert!(matches!(
        tabulate(&e, &too_many_seats),
        Err(TabulationError::Configuration(_))
    ));

    let unseeded = ElectionRules {
        tiebreak_mode: TiebreakMode::Random,
        ..exact_rules()
    };
    assert!(matches!(
        tabulate(&e, &unseeded),
        Err(TabulationError::Configuration(_))
    ));
}

#[test]
fn round_limit_aborts_with_history() {
    let e = abc();
    let rules = exact_rules();
    let err = RoundEngine::new(&e, &rules)
        .unwrap()
        .with_round_limit(1)
        .tabulate()
        .unwrap_err();

    match &err {
        TabulationError::NonTermination { round, .. } => assert_eq!(*round, 2),
        other => panic!("expected non-termination, got {:?}", other),
    }
    let history = err.history();
    assert_eq!(history.len(), 1);
    assert_eq!(names(&e, &history[0].losers), vec!["C"]);
}

#[test]
fn round_limit_above_roster_size_changes_nothing() {
    let e = abc();
    let rules = exact_rules();
    let result = RoundEngine::new(&e, &rules)
        .unwrap()
        .with_round_limit(100)
        .tabulate()
        .unwrap();
    assert_eq!(names(&e, &result.winners), vec!["A"]);
}

#[test]
fn no_ballots_still_terminates() {
    let e = election("A B C", &[]);
    let rules = exact_rules();
    let result = tabulate(&e, &rules).unwrap();
    assert_eq!(result.winners.len(), 1);
    assert!(result.rounds.len() <= 3);
}
