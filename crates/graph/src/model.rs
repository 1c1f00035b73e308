use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Person,
    Club,
    Source,
    NationalityClaim,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Person,
        NodeKind::Club,
        NodeKind::Source,
        NodeKind::NationalityClaim,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Person -> NationalityClaim
    Claims,
    /// Person -> Source, one per observing source
    ObservedIn,
    /// Person -> Club
    PlaysFor,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 3] = [EdgeKind::Claims, EdgeKind::ObservedIn, EdgeKind::PlaysFor];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Claims => "claims",
            EdgeKind::ObservedIn => "observed_in",
            EdgeKind::PlaysFor => "plays_for",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal-valued properties carried by nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Label,
    BirthDate,
    BirthPlace,
    /// Locale-table form of a nationality claim ("Italian" -> "italy")
    CanonicalClaim,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Label,
        Attribute::BirthDate,
        Attribute::BirthPlace,
        Attribute::CanonicalClaim,
    ];
}

/// Typed node identity. `key` is the entity id, source id or folded value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub kind: NodeKind,
    pub key: String,
}

impl NodeId {
    pub fn new(kind: NodeKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub attributes: BTreeMap<Attribute, String>,
}

impl GraphNode {
    pub fn new(kind: NodeKind, key: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(kind, key),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute, value: impl Into<String>) -> Self {
        self.attributes.insert(attribute, value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub from: NodeId,
    pub to: NodeId,
    /// Observation edges keep one copy per source
    pub source_id: Option<String>,
}

impl GraphEdge {
    pub fn new(kind: EdgeKind, from: NodeId, to: NodeId) -> Self {
        Self {
            kind,
            from,
            to,
            source_id: None,
        }
    }

    pub fn observed_in(person: NodeId, source_id: &str) -> Self {
        Self {
            kind: EdgeKind::ObservedIn,
            from: person,
            to: NodeId::new(NodeKind::Source, source_id),
            source_id: Some(source_id.to_string()),
        }
    }
}
