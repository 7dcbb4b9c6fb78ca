use crate::model::election::{Candidate, CandidateId, Choice};
use std::collections::HashMap;

pub const UNDECLARED_WRITE_INS: &str = "Undeclared Write-ins";

/// Maps the identifiers found in CVR cells to roster candidates.
#[derive(Debug, Clone)]
pub struct CandidateMap {
    by_label: HashMap<String, CandidateId>,
    undeclared_write_in: Choice,
}

impl CandidateMap {
    pub fn new(roster: &[Candidate]) -> CandidateMap {
        let mut by_label = HashMap::new();
        for (i, candidate) in roster.iter().enumerate() {
            let id = CandidateId(i as u32);
            by_label.insert(candidate.name.trim().to_string(), id);
            if let Some(code) = &candidate.code {
                by_label.entry(code.trim().to_string()).or_insert(id);
            }
        }

        let undeclared_write_in = match by_label.get(UNDECLARED_WRITE_INS) {
            Some(id) => Choice::Candidate(*id),
            None => Choice::WriteIn,
        };

        CandidateMap {
            by_label,
            undeclared_write_in,
        }
    }

    pub fn get(&self, label: &str) -> Option<CandidateId> {
        self.by_label.get(label.trim()).copied()
    }

    /// The choice an undeclared write-in counts as: the roster's
    /// `Undeclared Write-ins` entry when there is one.
    pub fn undeclared_write_in(&self) -> Choice {
        self.undeclared_write_in.clone()
    }
}
