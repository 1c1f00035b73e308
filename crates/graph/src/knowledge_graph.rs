use merge::entity::{BIRTH_DATE, BIRTH_PLACE, CURRENT_CLUB, NATIONALITY_CLAIMS};
use merge::CanonicalEntity;
use normalize::{fold_text, RecordNormalizer};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{Attribute, EdgeKind, GraphEdge, GraphNode, NodeId, NodeKind};

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("{kind} edge references missing node {missing}")]
    MissingEndpoint { kind: EdgeKind, missing: NodeId },
}

/// Typed multi-edge graph over canonical entities
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    node_index: HashMap<NodeId, NodeIndex>,
    edge_set: HashSet<GraphEdge>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: an existing node keeps its attributes, new ones are added
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node.id) {
            let existing = &mut self.graph[idx];
            for (attribute, value) in node.attributes {
                existing.attributes.entry(attribute).or_insert(value);
            }
            return idx;
        }

        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        idx
    }

    /// Returns false when the same edge was already present
    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<bool, GraphError> {
        let missing = |id: &NodeId| GraphError::MissingEndpoint {
            kind: edge.kind,
            missing: id.clone(),
        };
        let from = *self.node_index.get(&edge.from).ok_or_else(|| missing(&edge.from))?;
        let to = *self.node_index.get(&edge.to).ok_or_else(|| missing(&edge.to))?;

        if self.edge_set.contains(&edge) {
            return Ok(false);
        }
        self.edge_set.insert(edge.clone());
        self.graph.add_edge(from, to, edge);
        Ok(true)
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes in identity order
    pub fn nodes(&self) -> Vec<&GraphNode> {
        let mut nodes: Vec<&GraphNode> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Edges in identity order
    pub fn edges(&self) -> Vec<&GraphEdge> {
        let mut edges: Vec<&GraphEdge> = self.graph.edge_weights().collect();
        edges.sort();
        edges
    }

    /// Targets reached from `from` over edges of `kind`
    pub fn related(&self, from: &NodeId, kind: EdgeKind) -> Vec<&GraphNode> {
        let Some(&idx) = self.node_index.get(from) else {
            return Vec::new();
        };
        let mut targets: Vec<&GraphNode> = self
            .graph
            .edges(idx)
            .filter(|edge| edge.weight().kind == kind)
            .map(|edge| &self.graph[edge.target()])
            .collect();
        targets.sort_by(|a, b| a.id.cmp(&b.id));
        targets
    }
}

/// Projects canonical entities into a knowledge graph
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    normalizer: RecordNormalizer,
}

impl GraphBuilder {
    /// `normalizer` supplies the canonical form recorded on claim nodes
    pub fn new(normalizer: RecordNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn build(&self, entities: &[CanonicalEntity]) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();

        let mut ordered: Vec<&CanonicalEntity> = entities.iter().collect();
        ordered.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

        for entity in ordered {
            for edge in self.project_entity(&mut graph, entity) {
                if let Err(err) = graph.add_edge(edge) {
                    warn!(entity_id = %entity.entity_id, error = %err, "Skipping edge");
                }
            }
        }

        info!(
            entities = entities.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Knowledge graph built"
        );
        graph
    }

    /// Adds the entity's nodes and returns the edges connecting them
    fn project_entity(&self, graph: &mut KnowledgeGraph, entity: &CanonicalEntity) -> Vec<GraphEdge> {
        let mut person = GraphNode::new(NodeKind::Person, entity.entity_id.as_str())
            .with_attribute(Attribute::Label, entity.display_name.as_str());
        if let Some(date) = entity.text(BIRTH_DATE) {
            person = person.with_attribute(Attribute::BirthDate, date);
        }
        if let Some(place) = entity.text(BIRTH_PLACE) {
            person = person.with_attribute(Attribute::BirthPlace, place);
        }
        let person_id = person.id.clone();
        graph.add_node(person);

        let mut edges = Vec::new();

        for source_id in &entity.member_source_ids {
            graph.add_node(GraphNode::new(NodeKind::Source, source_id.as_str()));
            edges.push(GraphEdge::observed_in(person_id.clone(), source_id));
        }

        let claims = entity
            .field(NATIONALITY_CLAIMS)
            .and_then(|f| f.value.as_set())
            .unwrap_or_default();
        for claim in claims {
            // One node per distinct claim string; spellings of the same
            // nationality share the canonical attribute
            let key = fold_text(claim);
            if key.is_empty() {
                continue;
            }
            let mut node = GraphNode::new(NodeKind::NationalityClaim, key)
                .with_attribute(Attribute::Label, claim.as_str());
            if let Some(canonical) = self.normalizer.normalize_claim(claim) {
                node = node.with_attribute(Attribute::CanonicalClaim, canonical);
            }
            let claim_id = node.id.clone();
            graph.add_node(node);
            edges.push(GraphEdge::new(EdgeKind::Claims, person_id.clone(), claim_id));
        }

        if let Some(club) = entity.text(CURRENT_CLUB) {
            let key = fold_text(club);
            if !key.is_empty() {
                let node = GraphNode::new(NodeKind::Club, key).with_attribute(Attribute::Label, club);
                let club_id = node.id.clone();
                graph.add_node(node);
                edges.push(GraphEdge::new(EdgeKind::PlaysFor, person_id.clone(), club_id));
            }
        }

        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge::{FieldValue, MergedField};
    use std::collections::BTreeMap;

    fn field(value: FieldValue) -> MergedField {
        MergedField {
            value,
            confidence: 1.0,
            sources: vec!["s1".to_string()],
        }
    }

    fn entity(id: &str, name: &str, claims: &[&str], club: Option<&str>, sources: &[&str]) -> CanonicalEntity {
        let mut merged_fields = BTreeMap::new();
        if !claims.is_empty() {
            merged_fields.insert(
                NATIONALITY_CLAIMS.to_string(),
                field(FieldValue::Set(claims.iter().map(|c| c.to_string()).collect())),
            );
        }
        if let Some(club) = club {
            merged_fields.insert(CURRENT_CLUB.to_string(), field(FieldValue::Text(club.to_string())));
        }
        CanonicalEntity {
            entity_id: id.to_string(),
            display_name: name.to_string(),
            merged_fields,
            member_record_ids: vec![],
            member_source_ids: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_edge_requires_endpoints() {
        let mut graph = KnowledgeGraph::new();
        let person = NodeId::new(NodeKind::Person, "ent-1");
        graph.add_node(GraphNode::new(NodeKind::Person, "ent-1"));

        let err = graph
            .add_edge(GraphEdge::new(
                EdgeKind::PlaysFor,
                person,
                NodeId::new(NodeKind::Club, "juventus"),
            ))
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingEndpoint { kind: EdgeKind::PlaysFor, .. }));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_duplicate_edges_are_ignored() {
        let mut graph = KnowledgeGraph::new();
        let person = NodeId::new(NodeKind::Person, "ent-1");
        let club = NodeId::new(NodeKind::Club, "juventus");
        graph.add_node(GraphNode::new(NodeKind::Person, "ent-1"));
        graph.add_node(GraphNode::new(NodeKind::Club, "juventus"));

        assert_eq!(graph.add_edge(GraphEdge::new(EdgeKind::PlaysFor, person.clone(), club.clone())), Ok(true));
        assert_eq!(graph.add_edge(GraphEdge::new(EdgeKind::PlaysFor, person.clone(), club.clone())), Ok(false));
        // A different type between the same pair is a parallel edge
        assert_eq!(graph.add_edge(GraphEdge::new(EdgeKind::Claims, person, club)), Ok(true));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_build_shares_nodes_across_entities() {
        let entities = vec![
            entity("ent-a", "Luiz Pereira", &["Italian", "Brazil"], Some("Juventus"), &["feed-a", "feed-b"]),
            entity("ent-b", "Marco Rossi", &["Italy"], Some("JUVENTUS"), &["feed-a"]),
        ];
        let graph = GraphBuilder::default().build(&entities);

        let kinds: Vec<NodeKind> = graph.nodes().iter().map(|n| n.id.kind).collect();
        assert_eq!(kinds.iter().filter(|k| **k == NodeKind::Person).count(), 2);
        assert_eq!(kinds.iter().filter(|k| **k == NodeKind::Source).count(), 2);
        assert_eq!(kinds.iter().filter(|k| **k == NodeKind::NationalityClaim).count(), 3);
        assert_eq!(kinds.iter().filter(|k| **k == NodeKind::Club).count(), 1);

        let person = NodeId::new(NodeKind::Person, "ent-a");
        let sources = graph.related(&person, EdgeKind::ObservedIn);
        assert_eq!(sources.len(), 2);
        let claims: Vec<&str> = graph
            .related(&person, EdgeKind::Claims)
            .iter()
            .map(|n| n.id.key.as_str())
            .collect();
        assert_eq!(claims, vec!["brazil", "italian"]);

        // Distinct spellings stay distinct nodes but share the canonical claim
        for key in ["italian", "italy"] {
            let node = graph.node(&NodeId::new(NodeKind::NationalityClaim, key)).unwrap();
            assert_eq!(
                node.attributes.get(&Attribute::CanonicalClaim).map(String::as_str),
                Some("italy")
            );
        }

        // First spelling wins the label
        let club = graph.node(&NodeId::new(NodeKind::Club, "juventus")).unwrap();
        assert_eq!(club.attributes.get(&Attribute::Label).map(String::as_str), Some("Juventus"));
    }
}
