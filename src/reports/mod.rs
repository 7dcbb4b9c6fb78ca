use crate::util::write_serialized;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub mod generator;

pub use generator::generate_summary;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;

/// Round-by-round contest summary, in the layout published alongside RCTab results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestSummary {
    pub config: SummaryConfig,
    pub results: Vec<RoundResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub contest: String,
    pub date: String,
    pub jurisdiction: String,
    pub office: String,
    /// Threshold of the final round.
    pub threshold: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u32,
    /// Candidate name to vote total.
    pub tally: BTreeMap<String, String>,
    #[serde(rename = "tallyResults")]
    pub tally_results: Vec<TallyResult>,
}

/// What happened to one candidate in a round, with where their votes went.
/// The `exhausted` key collects weight that reached no continuing candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TallyResult {
    Elected {
        elected: String,
        transfers: BTreeMap<String, String>,
    },
    Eliminated {
        eliminated: String,
        transfers: BTreeMap<String, String>,
    },
}

impl ContestSummary {
    pub fn read(path: &Path) -> ReportResult<ContestSummary> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write(&self, path: &Path) -> ReportResult<()> {
        write_serialized(path, self)?;
        Ok(())
    }

    pub fn winners(&self) -> Vec<&str> {
        self.results
            .iter()
            .flat_map(|r| r.tally_results.iter())
            .filter_map(|t| match t {
                TallyResult::Elected { elected, .. } => Some(elected.as_str()),
                TallyResult::Eliminated { .. } => None,
            })
            .collect()
    }
}
