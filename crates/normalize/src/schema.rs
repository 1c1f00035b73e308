use chrono::{Datelike, NaiveDate};
use ingest::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parsed birth date, degrading to `Unknown` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BirthDate {
    Known(NaiveDate),
    /// Only the year could be recovered
    Year(i32),
    Unknown,
}

impl BirthDate {
    pub fn year(&self) -> Option<i32> {
        match self {
            BirthDate::Known(date) => Some(date.year()),
            BirthDate::Year(year) => Some(*year),
            BirthDate::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, BirthDate::Unknown)
    }
}

/// Canonical place token, or the explicit unknown marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Place {
    Known(String),
    Unknown,
}

impl Place {
    pub fn as_known(&self) -> Option<&str> {
        match self {
            Place::Known(token) => Some(token),
            Place::Unknown => None,
        }
    }
}

/// Read-only canonical view of one `CandidateRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: RecordId,
    pub source_id: String,
    /// Case, diacritic and whitespace folded; empty when the name is unknown
    pub folded_name: String,
    pub name_tokens: Vec<String>,
    pub birth_date: BirthDate,
    pub birth_place: Place,
    pub nationality_claims: BTreeSet<String>,
    pub club: Option<String>,
}

impl NormalizedRecord {
    pub fn name_is_unknown(&self) -> bool {
        self.name_tokens.is_empty()
    }

    /// Name with token boundaries removed ("de rossi" and "derossi" agree)
    pub fn compact_name(&self) -> String {
        self.name_tokens.concat()
    }

    pub fn first_token(&self) -> Option<&str> {
        self.name_tokens.first().map(|s| s.as_str())
    }
}
