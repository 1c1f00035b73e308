pub mod config;
pub mod error;

pub use config::PipelineConfig;
pub use error::PipelineError;

use graph::GraphBuilder;
use ingest::CandidateRecord;
use merge::{AuditEntry, CanonicalEntity, EntityMerger, StrategyTable};
use normalize::RecordNormalizer;
use resolve::{CancelFlag, CapacityWarning, ResolutionStats, Resolver, RunContext};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// What one batch run hands back to its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Sorted by entity id
    pub entities: Vec<CanonicalEntity>,
    /// One entry per entity, same order
    pub audit: Vec<AuditEntry>,
    /// Triple statements, one per line
    pub graph_export: String,
    pub warnings: Vec<CapacityWarning>,
    pub stats: RunStats,
    /// False when the budget or a cancellation cut the run short
    pub complete: bool,
}

impl RunOutput {
    pub fn needs_review(&self) -> impl Iterator<Item = &AuditEntry> {
        self.audit.iter().filter(|entry| entry.needs_review())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub resolution: ResolutionStats,
    pub entities: usize,
    pub low_confidence_entities: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
}

/// Normalize, resolve, merge and project one batch of records.
///
/// Construction validates the whole configuration; after that a run cannot
/// fail. Bad records degrade to unknown markers and ambiguous merges are
/// reported in the audit trail.
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: RecordNormalizer,
    resolver: Resolver,
    merger: EntityMerger,
    graph_builder: GraphBuilder,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let normalizer = RecordNormalizer::new(config.locale.clone());
        let resolver = Resolver::new(config.resolution.clone())?;
        let merger = EntityMerger::new(config.merge, StrategyTable::new(&normalizer))?;
        let graph_builder = GraphBuilder::new(normalizer.clone());

        Ok(Self {
            config,
            normalizer,
            resolver,
            merger,
            graph_builder,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, records: Vec<CandidateRecord>) -> RunOutput {
        self.run_with(records, &CancelFlag::new())
    }

    /// Run with a cancellation flag that is honored between blocks
    pub fn run_with(&self, records: Vec<CandidateRecord>, cancel: &CancelFlag) -> RunOutput {
        let start = Instant::now();
        let ctx = RunContext::new(records, &self.normalizer);

        let resolution = self.resolver.resolve_with(&ctx, &self.config.budget, cancel);
        let (mut entities, mut audit) = self.merger.merge_all(&resolution.clusters, &ctx);
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        audit.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

        let graph = self.graph_builder.build(&entities);
        let graph_export = graph::export(&graph, &self.config.vocabulary);

        let stats = RunStats {
            entities: entities.len(),
            low_confidence_entities: audit.iter().filter(|a| a.needs_review()).count(),
            graph_nodes: graph.node_count(),
            graph_edges: graph.edge_count(),
            resolution: resolution.stats,
        };

        info!(
            records = stats.resolution.records,
            blocks = stats.resolution.blocks,
            pairs_compared = stats.resolution.pairs_compared,
            qualifying_edges = stats.resolution.qualifying_edges,
            clusters = stats.resolution.clusters,
            entities = stats.entities,
            low_confidence = stats.low_confidence_entities,
            complete = resolution.complete,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline run finished"
        );

        RunOutput {
            entities,
            audit,
            graph_export,
            warnings: resolution.warnings,
            stats,
            complete: resolution.complete,
        }
    }
}
