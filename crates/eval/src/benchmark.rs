use anyhow::Result;
use ingest::RecordId;
use merge::CanonicalEntity;
use pipeline::{Pipeline, PipelineConfig};
use resolve::LinkageMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::test_set::{labels, LabeledRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResults {
    pub total_records: usize,
    pub true_entities: usize,
    pub runs: Vec<SweepPoint>,
    pub connected_components: LinkageSummary,
    pub complete_linkage: LinkageSummary,
}

/// One pipeline run at a fixed threshold and linkage mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    pub threshold: f64,
    pub linkage: LinkageMode,
    pub scores: PairwiseScores,
    pub entities: usize,
    pub low_confidence_entities: usize,
    pub pairs_compared: usize,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkageSummary {
    pub linkage: LinkageMode,
    pub best_threshold: f64,
    pub best_f1: f64,
    pub avg_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
}

/// Precision and recall over same-entity record pairs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PairwiseScores {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl PairwiseScores {
    fn from_counts(true_positives: usize, false_positives: usize, false_negatives: usize) -> Self {
        let ratio = |num: usize, den: usize| if den == 0 { 1.0 } else { num as f64 / den as f64 };
        let precision = ratio(true_positives, true_positives + false_positives);
        let recall = ratio(true_positives, true_positives + false_negatives);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
        }
    }
}

/// Score predicted entities against the true person of every record.
///
/// Records missing from `truth` are ignored.
pub fn score_partition(entities: &[CanonicalEntity], truth: &HashMap<RecordId, usize>) -> PairwiseScores {
    let mut true_positives = 0;
    let mut predicted_pairs = 0;

    for entity in entities {
        let people: Vec<usize> = entity
            .member_record_ids
            .iter()
            .filter_map(|id| truth.get(id).copied())
            .collect();
        for (i, a) in people.iter().enumerate() {
            for b in &people[i + 1..] {
                predicted_pairs += 1;
                if a == b {
                    true_positives += 1;
                }
            }
        }
    }

    let mut group_sizes: HashMap<usize, usize> = HashMap::new();
    for person in truth.values() {
        *group_sizes.entry(*person).or_default() += 1;
    }
    let true_pairs: usize = group_sizes.values().map(|n| n * n.saturating_sub(1) / 2).sum();

    PairwiseScores::from_counts(
        true_positives,
        predicted_pairs - true_positives,
        true_pairs.saturating_sub(true_positives),
    )
}

pub struct Benchmarker {
    base: PipelineConfig,
    thresholds: Vec<f64>,
}

impl Default for Benchmarker {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Benchmarker {
    pub fn new(base: PipelineConfig) -> Self {
        Self {
            base,
            thresholds: (0..=8).map(|i| 0.60 + 0.05 * i as f64).collect(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Vec<f64>) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn run_benchmark(&self, test_set: &[LabeledRecord]) -> Result<BenchmarkResults> {
        println!(
            "Running benchmark with {} records over {} thresholds...",
            test_set.len(),
            self.thresholds.len()
        );
        let truth = labels(test_set);
        let records: Vec<_> = test_set.iter().map(|l| l.record.clone()).collect();

        let mut runs = Vec::new();
        for linkage in [LinkageMode::ConnectedComponents, LinkageMode::CompleteLinkage] {
            println!("Testing {linkage:?}...");
            for &threshold in &self.thresholds {
                let mut config = self.base.clone();
                config.resolution.fuzzy_threshold = threshold;
                config.resolution.linkage = linkage;
                let pipeline = Pipeline::new(config)?;

                let start = Instant::now();
                let output = pipeline.run(records.clone());
                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

                runs.push(SweepPoint {
                    threshold,
                    linkage,
                    scores: score_partition(&output.entities, &truth),
                    entities: output.stats.entities,
                    low_confidence_entities: output.stats.low_confidence_entities,
                    pairs_compared: output.stats.resolution.pairs_compared,
                    latency_ms,
                });
            }
        }

        let true_entities = {
            let mut people: Vec<usize> = truth.values().copied().collect();
            people.sort_unstable();
            people.dedup();
            people.len()
        };

        Ok(BenchmarkResults {
            total_records: test_set.len(),
            true_entities,
            connected_components: summarize(&runs, LinkageMode::ConnectedComponents),
            complete_linkage: summarize(&runs, LinkageMode::CompleteLinkage),
            runs,
        })
    }
}

fn summarize(runs: &[SweepPoint], linkage: LinkageMode) -> LinkageSummary {
    let points: Vec<&SweepPoint> = runs.iter().filter(|p| p.linkage == linkage).collect();

    // Earliest threshold wins ties
    let best = points
        .iter()
        .fold(None::<&SweepPoint>, |best, p| match best {
            Some(b) if b.scores.f1 >= p.scores.f1 => Some(b),
            _ => Some(p),
        });

    let mut latencies: Vec<f64> = points.iter().map(|p| p.latency_ms).collect();
    latencies.sort_by(|a, b| a.total_cmp(b));

    LinkageSummary {
        linkage,
        best_threshold: best.map_or(0.0, |b| b.threshold),
        best_f1: best.map_or(0.0, |b| b.scores.f1),
        avg_latency_ms: if latencies.is_empty() { 0.0 } else { statistical::mean(&latencies) },
        p50_latency_ms: if latencies.is_empty() { 0.0 } else { statistical::median(&latencies) },
        p95_latency_ms: percentile(&latencies, 95),
    }
}

fn percentile(sorted_data: &[f64], p: usize) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let index = (p as f64 / 100.0 * sorted_data.len() as f64) as usize;
    sorted_data[index.min(sorted_data.len() - 1)]
}
