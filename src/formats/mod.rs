//! Cast vote record readers.

pub mod common;
pub mod cvr_table;
pub mod ess;

use crate::config::{CvrSourceConfig, TabulatorConfig};
use crate::model::election::Election;
use common::CandidateMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Could not read {path}: {source}")]
    Spreadsheet {
        path: PathBuf,
        source: calamine::Error,
    },
    #[error("Unsupported CVR provider: {0}")]
    UnsupportedProvider(String),
    #[error("Data validation error: {0}")]
    DataValidation(String),
}

pub type Result<T> = std::result::Result<T, FormatError>;

/// Rows of cell text for one source, dispatched on its provider.
pub fn read_source_rows(path: &Path, source: &CvrSourceConfig) -> Result<Vec<Vec<String>>> {
    match source.provider.trim().to_lowercase().as_str() {
        "ess" => ess::read_rows(path),
        other => Err(FormatError::UnsupportedProvider(other.to_string())),
    }
}

/// Load the roster and every configured CVR source into one [`Election`].
pub fn load_election(config: &TabulatorConfig, config_path: &Path) -> Result<Election> {
    let roster = config.roster();
    let candidates = CandidateMap::new(&roster);
    let mut ballots = Vec::new();

    for source in &config.cvr_file_sources {
        let path = config.resolve_source(config_path, source);
        let rows = read_source_rows(&path, source)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| source.file_path.clone());

        let read = cvr_table::read_ballots(&rows, source, &candidates, &config.rules, &name)?;
        info!("Read {} ballots from {}", read.len(), path.display());
        ballots.extend(read);
    }

    Ok(Election::new(roster, ballots))
}
