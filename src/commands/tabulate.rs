use colored::Colorize;
use instant::Instant;
use rcv_tabulator::config::{TabulatorConfig, TiebreakMode};
use rcv_tabulator::formats::load_election;
use rcv_tabulator::model::election::{CandidateId, Election};
use rcv_tabulator::reports::generate_summary;
use rcv_tabulator::tabulator::{RoundEngine, TabulationRound, TieDirection, TieResolver};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Asks the operator on the terminal to break `stopCountingAndAsk` ties.
struct TerminalTieResolver {
    names: Vec<String>,
}

impl TieResolver for TerminalTieResolver {
    fn resolve(
        &mut self,
        direction: TieDirection,
        round: u32,
        tied: &[CandidateId],
    ) -> Option<CandidateId> {
        let verb = match direction {
            TieDirection::Eliminate => "eliminate",
            TieDirection::Elect => "elect",
        };
        eprintln!(
            "🤝 Round {} tie. Choose the candidate to {}:",
            round,
            verb.bold()
        );
        for (i, c) in tied.iter().enumerate() {
            eprintln!("  {}) {}", i + 1, self.names[c.index()]);
        }
        eprint!("> ");
        io::stderr().flush().ok()?;

        let line = io::stdin().lock().lines().next()?.ok()?;
        let answer = line.trim();
        if let Ok(n) = answer.parse::<usize>() {
            return tied.get(n.checked_sub(1)?).copied();
        }
        tied.iter()
            .copied()
            .find(|c| self.names[c.index()] == answer)
    }
}

fn print_rounds(election: &Election, rounds: &[TabulationRound]) {
    for round in rounds {
        println!(
            "🔄 Round {} (threshold {})",
            round.round_number.to_string().bright_cyan(),
            round.vote_threshold
        );
        for (candidate, total) in &round.vote_totals {
            let name = election.candidate_name(*candidate);
            let line = format!("    {:>14}  {}", total.to_string(), name);
            if round.winners.contains(candidate) {
                println!("{}", line.bright_green().bold());
            } else if round.losers.contains(candidate) {
                println!("{}", line.red());
            } else {
                println!("{}", line);
            }
        }
        if !round.exhausted.is_zero() {
            println!("    {:>14}  {}", round.exhausted.to_string(), "exhausted".dimmed());
        }
    }
}

fn default_output(config_path: &Path, config: &TabulatorConfig) -> PathBuf {
    let settings = &config.output_settings;
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let file = format!(
        "{}_summary.json",
        settings.contest_name.trim().replace(|c: char| !c.is_alphanumeric(), "_")
    );
    base.join(&settings.output_directory).join(file)
}

pub fn tabulate(
    config_path: &Path,
    output: Option<&Path>,
    max_rounds: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let config = TabulatorConfig::from_file(config_path)?;
    println!(
        "📋 Tabulating {}",
        config.output_settings.contest_name.bright_cyan()
    );

    let election = load_election(&config, config_path)?;
    println!(
        "🗳️  Loaded {} ballots for {} candidates",
        election.ballots.len().to_string().bright_yellow(),
        election.candidates.len().to_string().bright_yellow()
    );

    let mut engine = RoundEngine::new(&election, &config.rules)?;
    if config.rules.tiebreak_mode == TiebreakMode::StopCountingAndAsk {
        let names = election.candidates.iter().map(|c| c.name.clone()).collect();
        engine = engine.with_tie_resolver(Box::new(TerminalTieResolver { names }));
    }
    if let Some(limit) = max_rounds {
        engine = engine.with_round_limit(limit);
    }

    let tabulation = match engine.tabulate() {
        Ok(tabulation) => tabulation,
        Err(e) => {
            print_rounds(&election, e.history());
            return Err(e.into());
        }
    };
    print_rounds(&election, &tabulation.rounds);

    let winners: Vec<&str> = tabulation
        .winners
        .iter()
        .map(|w| election.candidate_name(*w))
        .collect();
    println!("🏆 Elected: {}", winners.join(", ").bright_green().bold());

    let summary = generate_summary(&election, &tabulation.rounds, &config.output_settings);
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(config_path, &config));
    summary.write(&path)?;

    println!(
        "✅ Wrote {} in {:.2} seconds",
        path.display().to_string().bright_green(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
