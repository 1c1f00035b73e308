use ingest::RecordId;
use serde::{Deserialize, Serialize};

/// Review trail for one merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entity_id: String,
    pub member_record_ids: Vec<RecordId>,
    /// Fields merged with confidence under the configured threshold
    pub low_confidence_fields: Vec<String>,
}

impl AuditEntry {
    pub fn needs_review(&self) -> bool {
        !self.low_confidence_fields.is_empty()
    }
}
