pub mod blocking;
pub mod budget;
pub mod cluster;
pub mod config;
pub mod context;
pub mod error;
pub mod similarity;

pub use blocking::{plan_blocks, soundex, Block, BlockPlan, CapacityWarning};
pub use budget::{CancelFlag, RunBudget};
pub use cluster::{Cluster, Clusterer, UnionFind};
pub use config::{BlockingStrategy, FieldWeights, LinkageMode, ResolutionConfig};
pub use context::RunContext;
pub use error::ConfigError;
pub use similarity::{Field, SimilarityEdge, SimilarityEngine};

use ingest::RecordId;
use normalize::NormalizedRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::budget::Deadline;

/// Partition of the processed records, with what it took to get there
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub clusters: Vec<Cluster>,
    pub warnings: Vec<CapacityWarning>,
    pub stats: ResolutionStats,
    /// False when a budget or cancellation stopped the run between blocks
    pub complete: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResolutionStats {
    pub records: usize,
    pub records_clustered: usize,
    pub blocks: usize,
    pub blocks_processed: usize,
    pub pairs_compared: usize,
    pub qualifying_edges: usize,
    pub clusters: usize,
    pub elapsed_ms: u64,
}

/// Blocking, pairwise scoring and clustering over one run context
pub struct Resolver {
    config: ResolutionConfig,
    engine: SimilarityEngine,
    clusterer: Clusterer,
}

impl Resolver {
    pub fn new(config: ResolutionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engine: SimilarityEngine::new(config.field_weights),
            clusterer: Clusterer::new(config.fuzzy_threshold, config.linkage),
            config,
        })
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    pub fn resolve(&self, ctx: &RunContext) -> Resolution {
        self.resolve_with(ctx, &RunBudget::unlimited(), &CancelFlag::new())
    }

    pub fn resolve_with(&self, ctx: &RunContext, budget: &RunBudget, cancel: &CancelFlag) -> Resolution {
        let deadline = Deadline::start(budget);
        let records = ctx.normalized();
        let plan = plan_blocks(records, &self.config);

        let allowed = budget
            .max_blocks
            .unwrap_or(plan.blocks.len())
            .min(plan.blocks.len());

        // Each block is independent; results keep block order
        let scored: Vec<Option<(usize, Vec<SimilarityEdge>)>> = plan.blocks[..allowed]
            .par_iter()
            .map(|block| {
                if cancel.is_cancelled() || deadline.expired() {
                    None
                } else {
                    Some(self.score_block(block, records))
                }
            })
            .collect();

        let mut processed: Vec<usize> = plan.unblocked.clone();
        let mut edges = Vec::new();
        let mut pairs_compared = 0;
        let mut blocks_processed = 0;
        for (block, result) in plan.blocks.iter().zip(&scored) {
            if let Some((compared, block_edges)) = result {
                blocks_processed += 1;
                pairs_compared += compared;
                processed.extend(&block.members);
                edges.extend(block_edges.iter().cloned());
            }
        }
        edges.sort_by(|x: &SimilarityEdge, y: &SimilarityEdge| (&x.a, &x.b).cmp(&(&y.a, &y.b)));

        let ids: Vec<RecordId> = processed.iter().map(|&pos| records[pos].id.clone()).collect();
        let clusters = self.clusterer.cluster(&ids, &edges);
        let complete = blocks_processed == plan.blocks.len();

        let stats = ResolutionStats {
            records: records.len(),
            records_clustered: ids.len(),
            blocks: plan.blocks.len(),
            blocks_processed,
            pairs_compared,
            qualifying_edges: edges.len(),
            clusters: clusters.len(),
            elapsed_ms: deadline.elapsed().as_millis() as u64,
        };

        if !complete {
            warn!(
                blocks = stats.blocks,
                blocks_processed = stats.blocks_processed,
                records_clustered = stats.records_clustered,
                records = stats.records,
                "Resolution stopped early; partition covers processed records only"
            );
        }
        info!(
            records = stats.records,
            blocks = stats.blocks,
            pairs_compared = stats.pairs_compared,
            qualifying_edges = stats.qualifying_edges,
            clusters = stats.clusters,
            elapsed_ms = stats.elapsed_ms,
            "Resolution finished"
        );

        Resolution {
            clusters,
            warnings: plan.warnings,
            stats,
            complete,
        }
    }

    /// Score every candidate pair of a block, keeping only qualifying edges
    fn score_block(&self, block: &Block, records: &[NormalizedRecord]) -> (usize, Vec<SimilarityEdge>) {
        // Rows are scored in parallel so one huge block does not run serially
        let edges = (0..block.members.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                block
                    .row(i)
                    .map(|(x, y)| self.engine.compare(&records[x], &records[y]))
                    .filter(|edge| edge.score >= self.config.fuzzy_threshold)
            })
            .collect();
        (block.pair_count(), edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::CandidateRecord;
    use normalize::RecordNormalizer;

    fn context(names: &[&str]) -> RunContext {
        let records = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                CandidateRecord::new(format!("r{i}"), *name, format!("s{i}")).with_birth_date("2001-01-01")
            })
            .collect();
        RunContext::new(records, &RecordNormalizer::default())
    }

    fn blocked() -> ResolutionConfig {
        ResolutionConfig {
            full_comparison_below: 0,
            ..ResolutionConfig::default()
        }
    }

    #[test]
    fn test_resolve_merges_variants() {
        let ctx = context(&["Luiz Pereira", "Luis Pereira", "Marco Rossi"]);
        let resolution = Resolver::new(blocked()).unwrap().resolve(&ctx);

        assert!(resolution.complete);
        assert_eq!(resolution.clusters.len(), 2);
        assert_eq!(resolution.stats.records_clustered, 3);
        assert_eq!(resolution.stats.qualifying_edges, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ResolutionConfig::default().with_threshold(-0.1);
        assert!(matches!(Resolver::new(config), Err(ConfigError::ThresholdOutOfRange(_))));
    }

    #[test]
    fn test_cancelled_run_is_partial_but_valid() {
        let ctx = context(&["Luiz Pereira", "Luis Pereira", "Marco Rossi", ""]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let resolution = Resolver::new(blocked())
            .unwrap()
            .resolve_with(&ctx, &RunBudget::unlimited(), &cancel);

        assert!(!resolution.complete);
        // Only the unblocked (nameless) record was processed
        assert_eq!(resolution.stats.records_clustered, 1);
        assert_eq!(resolution.clusters.len(), 1);
    }

    #[test]
    fn test_block_budget_is_a_prefix_of_the_full_run() {
        let ctx = context(&["Luiz Pereira", "Luis Pereira", "Marco Rossi", "Marko Rossi"]);
        let resolver = Resolver::new(blocked()).unwrap();

        let full = resolver.resolve(&ctx);
        let partial = resolver.resolve_with(&ctx, &RunBudget::unlimited().with_max_blocks(1), &CancelFlag::new());

        assert!(!partial.complete);
        assert_eq!(partial.stats.blocks_processed, 1);
        for cluster in &partial.clusters {
            assert!(full.clusters.contains(cluster));
        }
    }
}
