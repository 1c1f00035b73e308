pub mod knowledge_graph;
pub mod model;
pub mod triples;
pub mod vocabulary;

pub use knowledge_graph::{GraphBuilder, GraphError, KnowledgeGraph};
pub use model::{Attribute, EdgeKind, GraphEdge, GraphNode, NodeId, NodeKind};
pub use triples::{export, project, render, Object, Projection, Triple};
pub use vocabulary::{Vocabulary, VocabularyError};
