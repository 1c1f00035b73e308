use ingest::RecordId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const FULL_NAME: &str = "full_name";
pub const BIRTH_DATE: &str = "birth_date";
pub const BIRTH_PLACE: &str = "birth_place";
pub const NATIONALITY_CLAIMS: &str = "nationality_claims";
pub const CURRENT_CLUB: &str = "current_club";

/// A merged value, always copied verbatim from member records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Set(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Set(_) => None,
        }
    }

    pub fn as_set(&self) -> Option<&[String]> {
        match self {
            FieldValue::Set(items) => Some(items),
            FieldValue::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedField {
    pub value: FieldValue,
    /// Fraction of members carrying this field that agree with `value`
    pub confidence: f64,
    /// Contributing source ids, in ingestion order
    pub sources: Vec<String>,
}

/// Authoritative representation of one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub entity_id: String,
    pub display_name: String,
    pub merged_fields: BTreeMap<String, MergedField>,
    /// Sorted
    pub member_record_ids: Vec<RecordId>,
    /// Every source a member came from, in ingestion order
    pub member_source_ids: Vec<String>,
}

impl CanonicalEntity {
    pub fn field(&self, name: &str) -> Option<&MergedField> {
        self.merged_fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(|f| f.value.as_text())
    }

    pub fn low_confidence_fields(&self, threshold: f64) -> Vec<String> {
        self.merged_fields
            .iter()
            .filter(|(_, field)| field.confidence < threshold)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Deterministic id over the member set: same members, same id, in any order
pub fn entity_id_for(members: &[RecordId]) -> String {
    let mut sorted: Vec<&str> = members.iter().map(|m| m.as_str()).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut hasher = Sha256::new();
    hasher.update(sorted.join("\n").as_bytes());
    let result = hasher.finalize();
    format!("ent-{}", hex::encode(&result[..16]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_ignores_member_order() {
        let forward = vec![RecordId::from("a"), RecordId::from("b"), RecordId::from("c")];
        let shuffled = vec![RecordId::from("c"), RecordId::from("a"), RecordId::from("b")];

        assert_eq!(entity_id_for(&forward), entity_id_for(&shuffled));
        assert_ne!(entity_id_for(&forward), entity_id_for(&forward[..2]));
        assert!(entity_id_for(&forward).starts_with("ent-"));
    }

    #[test]
    fn test_low_confidence_fields() {
        let mut merged_fields = BTreeMap::new();
        merged_fields.insert(
            FULL_NAME.to_string(),
            MergedField {
                value: FieldValue::Text("Luiz Pereira".to_string()),
                confidence: 0.5,
                sources: vec!["a".to_string()],
            },
        );
        merged_fields.insert(
            BIRTH_PLACE.to_string(),
            MergedField {
                value: FieldValue::Text("Santos".to_string()),
                confidence: 1.0 / 3.0,
                sources: vec!["b".to_string()],
            },
        );
        let entity = CanonicalEntity {
            entity_id: "ent-x".to_string(),
            display_name: "Luiz Pereira".to_string(),
            merged_fields,
            member_record_ids: vec![],
            member_source_ids: vec!["a".to_string(), "b".to_string()],
        };

        assert_eq!(entity.low_confidence_fields(0.5), vec![BIRTH_PLACE.to_string()]);
    }
}
