use colored::Colorize;
use rcv_tabulator::config::TabulatorConfig;
use rcv_tabulator::util::file_hash;
use std::error::Error;
use std::path::Path;

pub fn info(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let config = TabulatorConfig::from_file(config_path)?;
    let settings = &config.output_settings;
    let rules = &config.rules;

    println!("Contest: {}", settings.contest_name.bright_cyan());
    if !settings.contest_office.is_empty() {
        println!("Office: {}", settings.contest_office);
    }
    if !settings.contest_jurisdiction.is_empty() {
        println!("Jurisdiction: {}", settings.contest_jurisdiction);
    }
    match settings.date() {
        Some(date) => println!("Date: {}", date.format("%B %-d, %Y")),
        None if !settings.contest_date.is_empty() => {
            println!("Date: {} {}", settings.contest_date, "(unparsed)".yellow())
        }
        None => {}
    }

    println!("Rules:");
    println!("    Winner election mode: {:?}", rules.winner_election_mode);
    println!("    Winners: {}", rules.number_of_winners);
    println!("    Tiebreak: {:?}", rules.tiebreak_mode);
    println!("    Overvotes: {:?}", rules.overvote_rule);
    println!("    Arithmetic: {:?}", rules.numeric_model());
    if !rules.rules_description.is_empty() {
        println!("    {}", rules.rules_description.dimmed());
    }

    println!("Candidates:");
    for candidate in &config.candidates {
        if candidate.excluded {
            println!("    {} {}", candidate.name.dimmed(), "(excluded)".dimmed());
        } else {
            println!("    {}", candidate.name);
        }
    }

    println!("CVR sources:");
    for source in &config.cvr_file_sources {
        let path = config.resolve_source(config_path, source);
        match file_hash(&path) {
            Ok(hash) => println!("    {} {} ({})", hash.dimmed(), source.file_path, source.provider),
            Err(e) => eprintln!("    ❌ {}: {}", source.file_path.red(), e),
        }
    }

    Ok(())
}
