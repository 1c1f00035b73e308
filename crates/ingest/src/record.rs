use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque record identifier assigned at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One observation of a person from one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: RecordId,
    pub full_name: String,
    pub birth_date: Option<String>,
    pub birth_place: Option<String>,
    pub nationality_claims: Vec<String>,
    pub source_id: String,
    /// Everything the model does not name (club, position, article text, ...)
    pub raw_fields: BTreeMap<String, String>,
}

impl CandidateRecord {
    pub fn new(id: impl Into<String>, full_name: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            id: RecordId(id.into()),
            full_name: full_name.into(),
            birth_date: None,
            birth_place: None,
            nationality_claims: Vec::new(),
            source_id: source_id.into(),
            raw_fields: BTreeMap::new(),
        }
    }

    /// Build a record whose id is derived from its source and position in that source
    pub fn ingested(
        source_id: impl Into<String>,
        ordinal: usize,
        full_name: impl Into<String>,
    ) -> Self {
        let source_id = source_id.into();
        let full_name = full_name.into();
        let id = generate_record_id(&source_id, ordinal, &full_name);
        Self::new(id, full_name, source_id)
    }

    pub fn with_birth_date(mut self, birth_date: impl Into<String>) -> Self {
        self.birth_date = Some(birth_date.into());
        self
    }

    pub fn with_birth_place(mut self, birth_place: impl Into<String>) -> Self {
        self.birth_place = Some(birth_place.into());
        self
    }

    pub fn with_nationality_claim(mut self, claim: impl Into<String>) -> Self {
        self.nationality_claims.push(claim.into());
        self
    }

    pub fn with_raw_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw_fields.insert(key.into(), value.into());
        self
    }

    /// Club affiliation, if the source reported one
    pub fn current_club(&self) -> Option<&str> {
        self.raw_fields
            .get(CURRENT_CLUB_FIELD)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

pub const CURRENT_CLUB_FIELD: &str = "current_club";

/// Stable record id: first 16 bytes of SHA-256 over source, ordinal and name.
pub fn generate_record_id(source_id: &str, ordinal: usize, full_name: &str) -> String {
    let mut hasher = Sha256::new();
    // NUL separators keep ("x1", 0) and ("x", 10) apart
    hasher.update(source_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(ordinal.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(full_name.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}
