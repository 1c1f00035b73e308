//! Graph to statement projection.
//!
//! `project` is a pure function of the graph and the vocabulary; `render`
//! only concerns itself with line syntax. Neither touches graph building.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write;

use crate::knowledge_graph::KnowledgeGraph;
use crate::model::{NodeId, NodeKind};
use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Object {
    /// Prefixed name or `<IRI>`, written as-is
    Term(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Object,
}

/// Statements grouped the way they are written out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub types: Vec<Triple>,
    pub attributes: Vec<Triple>,
    pub edges: Vec<Triple>,
}

impl Projection {
    pub fn len(&self) -> usize {
        self.types.len() + self.attributes.len() + self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.types.iter().chain(&self.attributes).chain(&self.edges)
    }
}

pub fn project(graph: &KnowledgeGraph, vocab: &Vocabulary) -> Projection {
    let mut projection = Projection::default();

    for node in graph.nodes() {
        let subject = node_term(&node.id, vocab);
        projection.types.push(Triple {
            subject: subject.clone(),
            predicate: "a".to_string(),
            object: Object::Term(vocab.class(node.id.kind).to_string()),
        });
        for (attribute, value) in &node.attributes {
            projection.attributes.push(Triple {
                subject: subject.clone(),
                predicate: vocab.attribute(*attribute).to_string(),
                object: Object::Literal(value.clone()),
            });
        }
    }

    for edge in graph.edges() {
        projection.edges.push(Triple {
            subject: node_term(&edge.from, vocab),
            predicate: vocab.predicate(edge.kind).to_string(),
            object: Object::Term(node_term(&edge.to, vocab)),
        });
    }

    projection.types.sort();
    projection.attributes.sort();
    projection.edges.sort();
    projection
}

/// One `subject predicate object .` line per statement, after the prefixes
pub fn render(projection: &Projection, vocab: &Vocabulary) -> String {
    let mut out = String::new();
    for (prefix, iri) in &vocab.prefixes {
        let _ = writeln!(out, "@prefix {prefix}: <{iri}> .");
    }
    if !vocab.prefixes.is_empty() {
        out.push('\n');
    }

    for triple in projection.iter() {
        let object = match &triple.object {
            Object::Term(term) => term.clone(),
            Object::Literal(text) => format!("\"{}\"", escape_literal(text)),
        };
        let _ = writeln!(out, "{} {} {} .", triple.subject, triple.predicate, object);
    }
    out
}

pub fn export(graph: &KnowledgeGraph, vocab: &Vocabulary) -> String {
    render(&project(graph, vocab), vocab)
}

fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn node_term(id: &NodeId, vocab: &Vocabulary) -> String {
    if id.kind == NodeKind::Source && looks_like_url(&id.key) {
        return format!("<{}>", id.key);
    }
    format!("{}:{}", vocab.namespace(id.kind), local_name(&id.key))
}

fn looks_like_url(key: &str) -> bool {
    (key.starts_with("http://") || key.starts_with("https://"))
        && !key.contains(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"'))
}

/// Slug of the key; keys that do not survive slugging unchanged get a hash
/// suffix so two keys never share a name.
fn local_name(key: &str) -> String {
    let slug = normalize::fold_tokens(key).join("-");
    if slug == key {
        return slug;
    }

    let digest = Sha256::digest(key.as_bytes());
    let suffix = hex::encode(&digest[..4]);
    if slug.is_empty() {
        suffix
    } else {
        format!("{slug}-{suffix}")
    }
}
