use ingest::RecordId;
use rayon::prelude::*;
use resolve::{Cluster, RunContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::audit::AuditEntry;
use crate::entity::{entity_id_for, CanonicalEntity};
use crate::strategy::{source_list, Member, StrategyTable};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Merged fields below this confidence are flagged for review
    pub low_confidence_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.5,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MergeConfigError {
    #[error("low confidence threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),
}

impl MergeConfig {
    pub fn validate(&self) -> Result<(), MergeConfigError> {
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            return Err(MergeConfigError::ThresholdOutOfRange(
                self.low_confidence_threshold,
            ));
        }
        Ok(())
    }
}

/// Collapses each cluster into one canonical entity
pub struct EntityMerger {
    strategies: StrategyTable,
    low_confidence_threshold: f64,
}

impl EntityMerger {
    pub fn new(config: MergeConfig, strategies: StrategyTable) -> Result<Self, MergeConfigError> {
        config.validate()?;
        Ok(Self {
            strategies,
            low_confidence_threshold: config.low_confidence_threshold,
        })
    }

    /// Merge every cluster, keeping cluster order
    pub fn merge_all(&self, clusters: &[Cluster], ctx: &RunContext) -> (Vec<CanonicalEntity>, Vec<AuditEntry>) {
        clusters
            .par_iter()
            .map(|cluster| self.merge(cluster, ctx))
            .unzip()
    }

    pub fn merge(&self, cluster: &Cluster, ctx: &RunContext) -> (CanonicalEntity, AuditEntry) {
        let mut members: Vec<Member<'_>> = cluster
            .members
            .iter()
            .filter_map(|id| {
                let Some(position) = ctx.position(id) else {
                    debug!(record_id = %id, "Cluster member missing from run context");
                    return None;
                };
                let record = &ctx.records()[position];
                Some(Member {
                    record,
                    normalized: &ctx.normalized()[position],
                    position,
                    source_rank: ctx.source_rank(&record.source_id),
                })
            })
            .collect();
        members.sort_by_key(|m| m.position);

        let mut member_record_ids: Vec<RecordId> = cluster.members.clone();
        member_record_ids.sort();
        member_record_ids.dedup();
        let entity_id = entity_id_for(&member_record_ids);

        let mut merged_fields = BTreeMap::new();
        for strategy in self.strategies.iter() {
            if let Some(field) = strategy.select(&members) {
                merged_fields.insert(strategy.field().to_string(), field);
            }
        }

        // Nameless clusters fall back to the earliest member's raw name
        let display_name = merged_fields
            .get(crate::entity::FULL_NAME)
            .and_then(|f| f.value.as_text())
            .map(str::to_string)
            .or_else(|| members.first().map(|m| m.record.full_name.clone()))
            .unwrap_or_default();

        let all_members: Vec<&Member<'_>> = members.iter().collect();
        let entity = CanonicalEntity {
            entity_id,
            display_name,
            merged_fields,
            member_record_ids,
            member_source_ids: source_list(&all_members),
        };

        let low_confidence_fields = entity.low_confidence_fields(self.low_confidence_threshold);
        if !low_confidence_fields.is_empty() {
            warn!(
                entity_id = %entity.entity_id,
                display_name = %entity.display_name,
                fields = ?low_confidence_fields,
                "Low-confidence merge; review recommended"
            );
        }

        let audit = AuditEntry {
            entity_id: entity.entity_id.clone(),
            member_record_ids: entity.member_record_ids.clone(),
            low_confidence_fields,
        };
        (entity, audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{BIRTH_DATE, BIRTH_PLACE, CURRENT_CLUB, FULL_NAME, NATIONALITY_CLAIMS};
    use ingest::CandidateRecord;
    use normalize::RecordNormalizer;

    fn merger() -> EntityMerger {
        EntityMerger::new(MergeConfig::default(), StrategyTable::default()).unwrap()
    }

    fn cluster_of(ctx: &RunContext) -> Cluster {
        let mut members: Vec<RecordId> = ctx.records().iter().map(|r| r.id.clone()).collect();
        members.sort();
        Cluster {
            members,
            edges: vec![],
        }
    }

    #[test]
    fn test_merge_scenario_pair() {
        let ctx = RunContext::new(
            vec![
                CandidateRecord::new("r1", "Luiz Pereira", "feed-a")
                    .with_birth_date("1999-03-02")
                    .with_birth_place("São Paulo"),
                CandidateRecord::new("r2", "Luis Pereira", "feed-b")
                    .with_birth_date("1999-03-02")
                    .with_birth_place("Sao Paulo"),
            ],
            &RecordNormalizer::default(),
        );

        let (entity, audit) = merger().merge(&cluster_of(&ctx), &ctx);

        assert_eq!(entity.display_name, "Luiz Pereira");
        assert_eq!(entity.text(BIRTH_DATE), Some("1999-03-02"));
        assert_eq!(entity.text(BIRTH_PLACE), Some("São Paulo"));
        assert_eq!(entity.field(FULL_NAME).unwrap().confidence, 0.5);
        assert_eq!(entity.field(BIRTH_DATE).unwrap().confidence, 1.0);
        assert_eq!(entity.field(BIRTH_PLACE).unwrap().confidence, 1.0);
        assert!(entity.field(NATIONALITY_CLAIMS).is_none());
        assert!(entity.field(CURRENT_CLUB).is_none());
        assert_eq!(entity.member_record_ids, vec![RecordId::from("r1"), RecordId::from("r2")]);
        assert_eq!(entity.member_source_ids, vec!["feed-a", "feed-b"]);

        // 0.5 is not below the default threshold
        assert!(!audit.needs_review());
        assert_eq!(audit.entity_id, entity.entity_id);
    }

    #[test]
    fn test_disagreeing_places_are_flagged() {
        let ctx = RunContext::new(
            vec![
                CandidateRecord::new("r1", "Ana Costa", "s1").with_birth_place("Santos"),
                CandidateRecord::new("r2", "Ana Costa", "s2").with_birth_place("Campinas"),
                CandidateRecord::new("r3", "Ana Costa", "s3").with_birth_place("Recife"),
            ],
            &RecordNormalizer::default(),
        );

        let (entity, audit) = merger().merge(&cluster_of(&ctx), &ctx);

        assert_eq!(entity.text(BIRTH_PLACE), Some("Santos"));
        assert!((entity.field(BIRTH_PLACE).unwrap().confidence - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(audit.low_confidence_fields, vec![BIRTH_PLACE.to_string()]);
    }

    #[test]
    fn test_club_comes_from_raw_fields() {
        let ctx = RunContext::new(
            vec![
                CandidateRecord::new("r1", "Ana Costa", "s1")
                    .with_raw_field(ingest::CURRENT_CLUB_FIELD, "Juventus"),
            ],
            &RecordNormalizer::default(),
        );

        let (entity, _) = merger().merge(&cluster_of(&ctx), &ctx);
        assert_eq!(entity.text(CURRENT_CLUB), Some("Juventus"));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = MergeConfig {
            low_confidence_threshold: 1.5,
        };
        assert_eq!(
            EntityMerger::new(config, StrategyTable::default()).err(),
            Some(MergeConfigError::ThresholdOutOfRange(1.5))
        );
    }
}
