//! Turns a rectangular table of cast vote records into ballots.
//!
//! The table is whatever a provider reader produced: rows of trimmed cell
//! strings, header rows first. Which columns hold rankings comes either from
//! `firstVoteColumnIndex` or from `Rank N` / `Choice N` header cells.

use super::common::CandidateMap;
use super::{FormatError, Result};
use crate::config::{CvrSourceConfig, ElectionRules};
use crate::model::election::{Ballot, Choice};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

lazy_static! {
    static ref RANK_HEADER_RX: Regex = Regex::new(r"(?i)\b(?:rank|choice)\s*(\d+)\b").unwrap();
}

/// Where ballots and rankings sit in one source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    /// 0-based index of the first ballot row.
    pub first_row: usize,
    /// 0-based rank columns, first choice first.
    pub rank_columns: Vec<usize>,
    pub id_column: Option<usize>,
}

impl TableLayout {
    pub fn detect(
        rows: &[Vec<String>],
        source: &CvrSourceConfig,
        rules: &ElectionRules,
    ) -> Result<TableLayout> {
        let first_row = source.first_vote_row_index.unwrap_or(2).saturating_sub(1);
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);

        let rank_columns: Vec<usize> = match source.first_vote_column_index {
            Some(column) => {
                let start = column.saturating_sub(1);
                let available = width.saturating_sub(start);
                (start..start + rules.rankings_to_read(available)).collect()
            }
            None => {
                let header = first_row
                    .checked_sub(1)
                    .and_then(|i| rows.get(i))
                    .ok_or_else(|| {
                        FormatError::DataValidation(format!(
                            "{}: no header row to detect rank columns from",
                            source.file_path
                        ))
                    })?;
                let by_rank: BTreeMap<u32, usize> = header
                    .iter()
                    .enumerate()
                    .filter_map(|(i, cell)| {
                        let caps = RANK_HEADER_RX.captures(cell)?;
                        let rank = caps.get(1)?.as_str().parse().ok()?;
                        Some((rank, i))
                    })
                    .collect();
                let columns: Vec<usize> = by_rank.into_iter().map(|(_, i)| i).collect();
                let k = rules.rankings_to_read(columns.len());
                columns.into_iter().take(k).collect()
            }
        };

        if rank_columns.is_empty() {
            return Err(FormatError::DataValidation(format!(
                "{}: no rank columns found",
                source.file_path
            )));
        }

        Ok(TableLayout {
            first_row,
            rank_columns,
            id_column: source.id_column_index.and_then(|c| c.checked_sub(1)),
        })
    }
}

/// Reads cells into choices according to one source's labels.
pub struct CellReader<'a> {
    source: &'a CvrSourceConfig,
    candidates: &'a CandidateMap,
}

impl<'a> CellReader<'a> {
    pub fn new(source: &'a CvrSourceConfig, candidates: &'a CandidateMap) -> CellReader<'a> {
        CellReader { source, candidates }
    }

    fn is_label(label: &str, cell: &str) -> bool {
        !label.is_empty() && label.trim() == cell
    }

    /// `None` means the cell does not name anything this source knows about.
    pub fn choice(&self, cell: &str) -> Option<Choice> {
        let cell = cell.trim();
        let source = self.source;

        if cell.is_empty() {
            return Some(if source.treat_blank_as_undeclared_write_in {
                self.candidates.undeclared_write_in()
            } else {
                Choice::Undervote
            });
        }
        if Self::is_label(&source.overvote_label, cell) {
            return Some(Choice::Overvote(Vec::new()));
        }
        if Self::is_label(&source.undervote_label, cell) {
            return Some(Choice::Undervote);
        }
        if Self::is_label(&source.undeclared_write_in_label, cell) {
            return Some(self.candidates.undeclared_write_in());
        }
        if let Some(id) = self.candidates.get(cell) {
            return Some(Choice::Candidate(id));
        }

        if !source.overvote_delimiter.is_empty() && cell.contains(&source.overvote_delimiter) {
            let marks: Option<Vec<_>> = cell
                .split(source.overvote_delimiter.as_str())
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| self.candidates.get(part))
                .collect();
            return marks.map(Choice::Overvote);
        }

        None
    }
}

/// Convert the ballot rows of `rows` into ballots.
pub fn read_ballots(
    rows: &[Vec<String>],
    source: &CvrSourceConfig,
    candidates: &CandidateMap,
    rules: &ElectionRules,
    source_name: &str,
) -> Result<Vec<Ballot>> {
    let layout = TableLayout::detect(rows, source, rules)?;
    debug!(
        "{}: ballots from row {}, rank columns {:?}",
        source_name,
        layout.first_row + 1,
        layout.rank_columns
    );
    let reader = CellReader::new(source, candidates);

    let mut ballots = Vec::new();
    for (row_index, row) in rows.iter().enumerate().skip(layout.first_row) {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let id = match layout.id_column.and_then(|c| row.get(c)) {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => format!("{}-{}", source_name, row_index + 1),
        };

        let mut choices = Vec::with_capacity(layout.rank_columns.len());
        for column in &layout.rank_columns {
            let cell = row.get(*column).map(String::as_str).unwrap_or("");
            let choice = reader.choice(cell).ok_or_else(|| {
                FormatError::DataValidation(format!(
                    "{}: unrecognized candidate {:?} at row {}, column {}",
                    source_name,
                    cell.trim(),
                    row_index + 1,
                    column + 1
                ))
            })?;
            choices.push(choice);
        }

        // Trailing blanks carry no information.
        while choices.last() == Some(&Choice::Undervote) {
            choices.pop();
        }
        ballots.push(Ballot::new(id, choices));
    }

    Ok(ballots)
}
