//! Contest configuration in the RCTab JSON layout.

pub mod lenient;
pub mod rules;

pub use rules::{ElectionRules, OvervoteRule, RulesError, TiebreakMode, WinnerElectionMode};

use crate::model::election::Candidate;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid rules: {0}")]
    Rules(#[from] RulesError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabulatorConfig {
    #[serde(default)]
    pub tabulator_version: Option<String>,
    pub output_settings: OutputSettings,
    pub cvr_file_sources: Vec<CvrSourceConfig>,
    pub candidates: Vec<CandidateConfig>,
    pub rules: ElectionRules,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    pub contest_name: String,
    #[serde(default)]
    pub output_directory: String,
    #[serde(default)]
    pub contest_date: String,
    #[serde(default)]
    pub contest_jurisdiction: String,
    #[serde(default)]
    pub contest_office: String,
    #[serde(default)]
    pub tabulate_by_precinct: bool,
    #[serde(default)]
    pub generate_cdf_json: bool,
}

impl OutputSettings {
    /// The contest date, when one is given and is a valid `YYYY-MM-DD` date.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.contest_date.trim(), "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvrSourceConfig {
    pub file_path: String,
    /// 1-based. When absent, rank columns are detected from the header row.
    #[serde(default, deserialize_with = "lenient::opt_usize_from_any")]
    pub first_vote_column_index: Option<usize>,
    /// 1-based row of the first ballot; rows above it are headers.
    #[serde(default, deserialize_with = "lenient::opt_usize_from_any")]
    pub first_vote_row_index: Option<usize>,
    #[serde(default, deserialize_with = "lenient::opt_usize_from_any")]
    pub id_column_index: Option<usize>,
    #[serde(default, deserialize_with = "lenient::opt_usize_from_any")]
    pub precinct_column_index: Option<usize>,
    pub provider: String,
    #[serde(default)]
    pub treat_blank_as_undeclared_write_in: bool,
    #[serde(default)]
    pub overvote_label: String,
    #[serde(default)]
    pub undervote_label: String,
    #[serde(default)]
    pub undeclared_write_in_label: String,
    #[serde(default)]
    pub overvote_delimiter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateConfig {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub excluded: bool,
}

impl From<&CandidateConfig> for Candidate {
    fn from(c: &CandidateConfig) -> Candidate {
        Candidate {
            name: c.name.clone(),
            code: c.code.clone().filter(|code| !code.trim().is_empty()),
            excluded: c.excluded,
        }
    }
}

impl TabulatorConfig {
    pub fn from_file(path: &Path) -> Result<TabulatorConfig> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TabulatorConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<TabulatorConfig> {
        let config: TabulatorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.rules.validate()?;

        if self.candidates.is_empty() {
            return Err(ConfigError::Invalid("no candidates declared".to_string()));
        }
        if self.cvr_file_sources.is_empty() {
            return Err(ConfigError::Invalid("no CVR sources declared".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for c in &self.candidates {
            if !seen.insert(c.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "candidate {:?} declared twice",
                    c.name
                )));
            }
        }

        for source in &self.cvr_file_sources {
            if source.first_vote_column_index == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{}: firstVoteColumnIndex is 1-based",
                    source.file_path
                )));
            }
            if self.rules.overvote_rule == OvervoteRule::ExhaustIfMultipleContinuing
                && !source.overvote_label.is_empty()
            {
                return Err(ConfigError::Invalid(format!(
                    "{}: an overvote label cannot be combined with exhaustIfMultipleContinuing",
                    source.file_path
                )));
            }
        }

        Ok(())
    }

    pub fn roster(&self) -> Vec<Candidate> {
        self.candidates.iter().map(Candidate::from).collect()
    }

    /// Resolve a CVR file path relative to the directory holding the config.
    pub fn resolve_source(&self, config_path: &Path, source: &CvrSourceConfig) -> PathBuf {
        let path = Path::new(&source.file_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(path)
        }
    }
}
