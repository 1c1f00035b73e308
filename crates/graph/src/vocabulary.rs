use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{Attribute, EdgeKind, NodeKind};

#[derive(Debug, Error, PartialEq)]
pub enum VocabularyError {
    #[error("no predicate configured for edge type {0:?}")]
    MissingPredicate(EdgeKind),
    #[error("no class configured for node type {0:?}")]
    MissingClass(NodeKind),
    #[error("no namespace configured for node type {0:?}")]
    MissingNamespace(NodeKind),
    #[error("no predicate configured for attribute {0:?}")]
    MissingAttribute(Attribute),
    #[error("term `{term}` uses undeclared prefix `{prefix}`")]
    UndeclaredPrefix { term: String, prefix: String },
    #[error("term `{0}` is neither a prefixed name nor an <IRI>")]
    MalformedTerm(String),
}

/// Terms used when serializing the graph. Every term is either a prefixed
/// name (`radar:Player`) whose prefix is declared, or a full `<IRI>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// prefix -> namespace IRI
    pub prefixes: BTreeMap<String, String>,
    /// Predicate per edge type
    pub predicates: BTreeMap<EdgeKind, String>,
    /// rdf:type object per node type
    pub classes: BTreeMap<NodeKind, String>,
    /// Prefix that node IRIs are minted under, per node type
    pub namespaces: BTreeMap<NodeKind, String>,
    pub attributes: BTreeMap<Attribute, String>,
}

const BASE: &str = "https://oriundi.ob1.dev";

impl Default for Vocabulary {
    fn default() -> Self {
        let prefixes = [
            ("radar", format!("{BASE}/schema#")),
            ("entity", format!("{BASE}/entity/")),
            ("source", format!("{BASE}/source/")),
            ("club", format!("{BASE}/club/")),
            ("nationality", format!("{BASE}/nationality/")),
        ]
        .into_iter()
        .map(|(p, iri)| (p.to_string(), iri))
        .collect();

        let predicates = [
            (EdgeKind::Claims, "radar:claimsNationality"),
            (EdgeKind::ObservedIn, "radar:mentionedIn"),
            (EdgeKind::PlaysFor, "radar:playsFor"),
        ]
        .into_iter()
        .map(|(k, t)| (k, t.to_string()))
        .collect();

        let classes = [
            (NodeKind::Person, "radar:Player"),
            (NodeKind::Club, "radar:Club"),
            (NodeKind::Source, "radar:Source"),
            (NodeKind::NationalityClaim, "radar:NationalityClaim"),
        ]
        .into_iter()
        .map(|(k, t)| (k, t.to_string()))
        .collect();

        let namespaces = [
            (NodeKind::Person, "entity"),
            (NodeKind::Club, "club"),
            (NodeKind::Source, "source"),
            (NodeKind::NationalityClaim, "nationality"),
        ]
        .into_iter()
        .map(|(k, p)| (k, p.to_string()))
        .collect();

        let attributes = [
            (Attribute::Label, "radar:label"),
            (Attribute::BirthDate, "radar:birthDate"),
            (Attribute::BirthPlace, "radar:birthPlace"),
            (Attribute::CanonicalClaim, "radar:canonicalNationality"),
        ]
        .into_iter()
        .map(|(k, t)| (k, t.to_string()))
        .collect();

        Self {
            prefixes,
            predicates,
            classes,
            namespaces,
            attributes,
        }
    }
}

impl Vocabulary {
    pub fn with_predicate(mut self, kind: EdgeKind, term: impl Into<String>) -> Self {
        self.predicates.insert(kind, term.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        self.prefixes.insert(prefix.into(), iri.into());
        self
    }

    pub fn validate(&self) -> Result<(), VocabularyError> {
        for kind in EdgeKind::ALL {
            let term = self
                .predicates
                .get(&kind)
                .ok_or(VocabularyError::MissingPredicate(kind))?;
            self.check_term(term)?;
        }
        for kind in NodeKind::ALL {
            let class = self.classes.get(&kind).ok_or(VocabularyError::MissingClass(kind))?;
            self.check_term(class)?;
            let namespace = self
                .namespaces
                .get(&kind)
                .ok_or(VocabularyError::MissingNamespace(kind))?;
            if !self.prefixes.contains_key(namespace) {
                return Err(VocabularyError::UndeclaredPrefix {
                    term: format!("{namespace}:"),
                    prefix: namespace.clone(),
                });
            }
        }
        for attribute in Attribute::ALL {
            let term = self
                .attributes
                .get(&attribute)
                .ok_or(VocabularyError::MissingAttribute(attribute))?;
            self.check_term(term)?;
        }
        Ok(())
    }

    fn check_term(&self, term: &str) -> Result<(), VocabularyError> {
        if term.starts_with('<') && term.ends_with('>') && term.len() > 2 {
            return Ok(());
        }
        match term.split_once(':') {
            Some((prefix, local)) if !local.is_empty() && !term.contains(char::is_whitespace) => {
                if self.prefixes.contains_key(prefix) {
                    Ok(())
                } else {
                    Err(VocabularyError::UndeclaredPrefix {
                        term: term.to_string(),
                        prefix: prefix.to_string(),
                    })
                }
            }
            _ => Err(VocabularyError::MalformedTerm(term.to_string())),
        }
    }

    pub(crate) fn predicate(&self, kind: EdgeKind) -> &str {
        self.predicates.get(&kind).map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn class(&self, kind: NodeKind) -> &str {
        self.classes.get(&kind).map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn namespace(&self, kind: NodeKind) -> &str {
        self.namespaces.get(&kind).map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn attribute(&self, attribute: Attribute) -> &str {
        self.attributes.get(&attribute).map(String::as_str).unwrap_or_default()
    }
}
