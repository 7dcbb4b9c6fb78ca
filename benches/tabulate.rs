use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rcv_tabulator::config::{ElectionRules, WinnerElectionMode};
use rcv_tabulator::model::election::{Ballot, Candidate, CandidateId, Choice, Election};
use rcv_tabulator::tabulator::tabulate;

fn synthetic_election(candidates: u32, ballots: usize, ranks: usize) -> Election {
    let mut rng = StdRng::seed_from_u64(7);
    let roster: Vec<CandidateId> = (0..candidates).map(CandidateId).collect();
    let cast = (0..ballots)
        .map(|i| {
            let mut order = roster.clone();
            order.shuffle(&mut rng);
            let choices = order.into_iter().take(ranks).map(Choice::Candidate).collect();
            Ballot::new(i.to_string(), choices)
        })
        .collect();
    let names = (0..candidates)
        .map(|i| Candidate::new(format!("Candidate {}", i)))
        .collect();
    Election::new(names, cast)
}

fn bench_tabulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("tabulate");
    group.sample_size(10);

    for ballots in [10_000usize, 100_000] {
        let election = synthetic_election(12, ballots, 5);

        let irv = ElectionRules::default();
        group.bench_with_input(BenchmarkId::new("irv", ballots), &election, |b, e| {
            b.iter(|| tabulate(black_box(e), &irv).map(|t| t.rounds.len()))
        });

        let stv = ElectionRules {
            winner_election_mode: WinnerElectionMode::MultiWinnerAllowMultipleWinnersPerRound,
            number_of_winners: 3,
            ..ElectionRules::default()
        };
        group.bench_with_input(BenchmarkId::new("stv", ballots), &election, |b, e| {
            b.iter(|| tabulate(black_box(e), &stv).map(|t| t.rounds.len()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tabulate);
criterion_main!(benches);
