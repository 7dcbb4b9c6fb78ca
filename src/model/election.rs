use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a candidate in the contest roster.
///
/// Roster order is configuration order, and is the canonical order used
/// anywhere output must be deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub u32);

impl CandidateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub code: Option<String>,
    /// Never eligible to receive votes.
    pub excluded: bool,
}

impl Candidate {
    pub fn new(name: String) -> Candidate {
        Candidate {
            name,
            code: None,
            excluded: false,
        }
    }

    pub fn with_code(mut self, code: String) -> Candidate {
        self.code = Some(code);
        self
    }
}

/// A single rank entry on a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    Candidate(CandidateId),
    /// More than one mark at this rank. Holds the marked candidates when the
    /// source data names them, and is empty when only an overvote label is known.
    Overvote(Vec<CandidateId>),
    Undervote,
    /// Undeclared write-in.
    WriteIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub id: String,
    pub choices: Vec<Choice>,
}

impl Ballot {
    pub fn new(id: String, choices: Vec<Choice>) -> Ballot {
        Ballot { id, choices }
    }
}

/// Everything the tabulator needs from the loading side: a roster and the
/// ballots cast against it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Election {
    pub candidates: Vec<Candidate>,
    pub ballots: Vec<Ballot>,
}

impl Election {
    pub fn new(candidates: Vec<Candidate>, ballots: Vec<Ballot>) -> Election {
        Election {
            candidates,
            ballots,
        }
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.get(id.index())
    }

    pub fn candidate_name(&self, id: CandidateId) -> &str {
        self.candidate(id).map(|c| c.name.as_str()).unwrap_or("<unknown>")
    }

    pub fn candidate_ids(&self) -> impl Iterator<Item = CandidateId> + '_ {
        (0..self.candidates.len()).map(|i| CandidateId(i as u32))
    }

    /// Find a candidate by name or code.
    pub fn find(&self, label: &str) -> Option<CandidateId> {
        self.candidates
            .iter()
            .position(|c| c.name == label || c.code.as_deref() == Some(label))
            .map(|i| CandidateId(i as u32))
    }
}
