mod commands;

use crate::commands::{info, tabulate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version, about = "Round-based RCV and STV tabulation")]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a contest config and dump its rules and CVR source hashes.
    Info {
        /// Contest configuration JSON.
        config: PathBuf,
    },
    /// Tabulate a contest and write its round-by-round summary.
    Tabulate {
        /// Contest configuration JSON.
        config: PathBuf,
        /// Summary output file (defaults to the config's output directory).
        #[clap(long)]
        output: Option<PathBuf>,
        /// Give up once a pass runs this many rounds without finishing.
        #[clap(long)]
        max_rounds: Option<usize>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rcv_tabulator=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let opts = Opts::parse();

    let result = match opts.command {
        Command::Info { config } => info(&config),
        Command::Tabulate {
            config,
            output,
            max_rounds,
        } => tabulate(&config, output.as_deref(), max_rounds),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "❌".red(), e);
        std::process::exit(1);
    }
}
