use ingest::{CandidateRecord, RecordId};
use normalize::{NormalizedRecord, RecordNormalizer};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::warn;

/// Everything one pipeline run knows about its batch. Built fresh per run
/// and handed to each stage; nothing outlives it.
#[derive(Debug, Clone)]
pub struct RunContext {
    records: Vec<CandidateRecord>,
    normalized: Vec<NormalizedRecord>,
    index: HashMap<RecordId, usize>,
    /// source_id -> position of its first appearance in the input
    source_rank: HashMap<String, usize>,
}

impl RunContext {
    pub fn new(records: Vec<CandidateRecord>, normalizer: &RecordNormalizer) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if index.contains_key(&record.id) {
                warn!(record_id = %record.id, "Duplicate record id; keeping first occurrence");
                continue;
            }
            index.insert(record.id.clone(), kept.len());
            kept.push(record);
        }

        let mut source_rank = HashMap::new();
        for record in &kept {
            let next = source_rank.len();
            source_rank.entry(record.source_id.clone()).or_insert(next);
        }

        let normalized = kept
            .par_iter()
            .map(|record| normalizer.normalize(record))
            .collect();

        Self {
            records: kept,
            normalized,
            index,
            source_rank,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn normalized(&self) -> &[NormalizedRecord] {
        &self.normalized
    }

    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn record(&self, id: &RecordId) -> Option<&CandidateRecord> {
        self.position(id).map(|pos| &self.records[pos])
    }

    pub fn normalized_record(&self, id: &RecordId) -> Option<&NormalizedRecord> {
        self.position(id).map(|pos| &self.normalized[pos])
    }

    /// Ingestion order of a source; unknown sources sort last
    pub fn source_rank(&self, source_id: &str) -> usize {
        self.source_rank.get(source_id).copied().unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_ids_keep_first() {
        let records = vec![
            CandidateRecord::new("r1", "First", "s1"),
            CandidateRecord::new("r1", "Second", "s2"),
            CandidateRecord::new("r2", "Third", "s2"),
        ];
        let ctx = RunContext::new(records, &RecordNormalizer::default());

        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.record(&RecordId::from("r1")).unwrap().full_name, "First");
        assert_eq!(ctx.normalized()[1].folded_name, "third");
    }

    #[test]
    fn test_source_rank_follows_first_appearance() {
        let records = vec![
            CandidateRecord::new("r1", "A", "feed-b"),
            CandidateRecord::new("r2", "B", "feed-a"),
            CandidateRecord::new("r3", "C", "feed-b"),
        ];
        let ctx = RunContext::new(records, &RecordNormalizer::default());

        assert_eq!(ctx.source_rank("feed-b"), 0);
        assert_eq!(ctx.source_rank("feed-a"), 1);
        assert_eq!(ctx.source_rank("missing"), usize::MAX);
    }
}
