//! Per-field merge strategies.
//!
//! Each field kind exposes the same contract: `score` rates one member's
//! value, `select` picks the merged value for the whole cluster. Adding a
//! field means adding a table entry, not touching the merger.

use ingest::CandidateRecord;
use normalize::{BirthDate, NormalizedRecord, Place, RecordNormalizer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::entity::{
    FieldValue, MergedField, BIRTH_DATE, BIRTH_PLACE, CURRENT_CLUB, FULL_NAME, NATIONALITY_CLAIMS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Name,
    FreeText,
    Date,
    Set,
}

/// One cluster member as seen by the strategies
#[derive(Debug, Clone, Copy)]
pub struct Member<'a> {
    pub record: &'a CandidateRecord,
    pub normalized: &'a NormalizedRecord,
    /// Position in the run's ingestion order
    pub position: usize,
    /// Ingestion order of the member's source
    pub source_rank: usize,
}

/// A member's value for one field
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    /// Verbatim from the record
    pub value: FieldValue,
    /// Normalized comparison key; equal keys agree
    pub key: String,
    pub quality: f64,
}

pub trait FieldStrategy: Send + Sync {
    fn field(&self) -> &str;

    fn kind(&self) -> FieldKind;

    /// The member's value, or `None` if it has no well-formed one
    fn observe(&self, member: &Member<'_>) -> Option<Observed>;

    /// Data-quality score of one member's value
    fn score(&self, member: &Member<'_>) -> Option<f64> {
        self.observe(member).map(|o| o.quality)
    }

    fn select(&self, members: &[Member<'_>]) -> Option<MergedField> {
        select_by_quality(members, |m| self.observe(m))
    }
}

/// Highest quality wins; ties go to the earliest source, then the earliest
/// record. Confidence is the share of observing members that agree.
pub fn select_by_quality<'a, F>(members: &[Member<'a>], observe: F) -> Option<MergedField>
where
    F: Fn(&Member<'a>) -> Option<Observed>,
{
    let observed: Vec<(&Member<'a>, Observed)> = members
        .iter()
        .filter_map(|m| observe(m).map(|o| (m, o)))
        .collect();

    let (_, best) = observed.iter().min_by(|(ma, a), (mb, b)| {
        b.quality
            .total_cmp(&a.quality)
            .then(ma.source_rank.cmp(&mb.source_rank))
            .then(ma.position.cmp(&mb.position))
    })?;

    let agreeing: Vec<&Member<'a>> = observed
        .iter()
        .filter(|(_, o)| o.key == best.key)
        .map(|(m, _)| *m)
        .collect();

    Some(MergedField {
        value: best.value.clone(),
        confidence: agreeing.len() as f64 / observed.len() as f64,
        sources: source_list(&agreeing),
    })
}

/// Distinct source ids in ingestion order
pub fn source_list(members: &[&Member<'_>]) -> Vec<String> {
    let mut ranked: Vec<(usize, &str)> = members
        .iter()
        .map(|m| (m.source_rank, m.record.source_id.as_str()))
        .collect();
    ranked.sort();
    ranked.dedup();
    ranked.into_iter().map(|(_, s)| s.to_string()).collect()
}

/// Favors values that keep their original casing and need no cleanup
fn text_quality(verbatim: &str) -> f64 {
    let trimmed = verbatim.trim();
    let mut quality = 0.5;
    if trimmed.chars().any(char::is_uppercase) && trimmed.chars().any(char::is_lowercase) {
        quality += 0.25;
    }
    if trimmed == verbatim && !trimmed.contains("  ") {
        quality += 0.25;
    }
    quality
}

/// Display name: the most frequent folded variant, first spelling kept
pub struct NameStrategy;

impl FieldStrategy for NameStrategy {
    fn field(&self) -> &str {
        FULL_NAME
    }

    fn kind(&self) -> FieldKind {
        FieldKind::Name
    }

    fn observe(&self, member: &Member<'_>) -> Option<Observed> {
        if member.normalized.name_is_unknown() {
            return None;
        }
        let tokens = member.normalized.name_tokens.len();
        Some(Observed {
            value: FieldValue::Text(member.record.full_name.clone()),
            key: member.normalized.folded_name.clone(),
            quality: if tokens > 1 { 1.0 } else { 0.5 },
        })
    }

    fn select(&self, members: &[Member<'_>]) -> Option<MergedField> {
        let mut ordered: Vec<&Member<'_>> = members.iter().collect();
        ordered.sort_by_key(|m| m.position);

        // (key, first spelling, supporting members) in first-occurrence order
        let mut variants: Vec<(String, FieldValue, Vec<&Member<'_>>)> = Vec::new();
        for member in ordered {
            let Some(observed) = self.observe(member) else {
                continue;
            };
            match variants.iter_mut().find(|(key, _, _)| *key == observed.key) {
                Some((_, _, support)) => support.push(member),
                None => variants.push((observed.key, observed.value, vec![member])),
            }
        }

        let total: usize = variants.iter().map(|(_, _, s)| s.len()).sum();
        let mut best: Option<&(String, FieldValue, Vec<&Member<'_>>)> = None;
        for variant in &variants {
            if best.is_none_or(|b| variant.2.len() > b.2.len()) {
                best = Some(variant);
            }
        }
        let (_, value, support) = best?;

        Some(MergedField {
            value: value.clone(),
            confidence: support.len() as f64 / total as f64,
            sources: source_list(support),
        })
    }
}

pub struct DateStrategy;

impl FieldStrategy for DateStrategy {
    fn field(&self) -> &str {
        BIRTH_DATE
    }

    fn kind(&self) -> FieldKind {
        FieldKind::Date
    }

    fn observe(&self, member: &Member<'_>) -> Option<Observed> {
        let verbatim = member.record.birth_date.as_ref()?;
        let (key, quality) = match member.normalized.birth_date {
            BirthDate::Known(date) => (date.format("%Y-%m-%d").to_string(), 1.0),
            BirthDate::Year(year) => (year.to_string(), 0.5),
            BirthDate::Unknown => return None,
        };
        Some(Observed {
            value: FieldValue::Text(verbatim.clone()),
            key,
            quality,
        })
    }
}

/// Free text compared through its normalized token (place, club, ...)
pub struct FreeTextStrategy {
    field: &'static str,
    extract: fn(&Member<'_>) -> Option<(String, String)>,
}

impl FreeTextStrategy {
    pub fn new(field: &'static str, extract: fn(&Member<'_>) -> Option<(String, String)>) -> Self {
        Self { field, extract }
    }

    pub fn birth_place() -> Self {
        Self::new(BIRTH_PLACE, |m| {
            let verbatim = m.record.birth_place.clone()?;
            match &m.normalized.birth_place {
                Place::Known(token) => Some((verbatim, token.clone())),
                Place::Unknown => None,
            }
        })
    }

    pub fn current_club() -> Self {
        Self::new(CURRENT_CLUB, |m| {
            let verbatim = m.record.current_club()?.to_string();
            let key = m.normalized.club.clone()?;
            Some((verbatim, key))
        })
    }
}

impl FieldStrategy for FreeTextStrategy {
    fn field(&self) -> &str {
        self.field
    }

    fn kind(&self) -> FieldKind {
        FieldKind::FreeText
    }

    fn observe(&self, member: &Member<'_>) -> Option<Observed> {
        let (verbatim, key) = (self.extract)(member)?;
        Some(Observed {
            quality: text_quality(&verbatim),
            value: FieldValue::Text(verbatim),
            key,
        })
    }
}

/// Nationality claims: the union of every member's claims
pub struct SetStrategy {
    normalizer: RecordNormalizer,
}

impl SetStrategy {
    pub fn new(normalizer: RecordNormalizer) -> Self {
        Self { normalizer }
    }

    /// Verbatim claims paired with their canonical key
    fn claims<'m>(&self, member: &'m Member<'_>) -> Vec<(&'m str, String)> {
        member
            .record
            .nationality_claims
            .iter()
            .filter_map(|claim| {
                self.normalizer
                    .normalize_claim(claim)
                    .map(|key| (claim.as_str(), key))
            })
            .collect()
    }
}

impl FieldStrategy for SetStrategy {
    fn field(&self) -> &str {
        NATIONALITY_CLAIMS
    }

    fn kind(&self) -> FieldKind {
        FieldKind::Set
    }

    fn observe(&self, member: &Member<'_>) -> Option<Observed> {
        if member.normalized.nationality_claims.is_empty() {
            return None;
        }
        let mut seen = BTreeSet::new();
        let claims = self
            .claims(member)
            .into_iter()
            .filter(|(_, key)| seen.insert(key.clone()))
            .map(|(claim, _)| claim.to_string())
            .collect();
        let key = member
            .normalized
            .nationality_claims
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("|");
        Some(Observed {
            value: FieldValue::Set(claims),
            key,
            quality: 1.0,
        })
    }

    fn select(&self, members: &[Member<'_>]) -> Option<MergedField> {
        let mut contributing: Vec<&Member<'_>> = members
            .iter()
            .filter(|m| !m.normalized.nationality_claims.is_empty())
            .collect();
        if contributing.is_empty() {
            return None;
        }
        contributing.sort_by_key(|m| m.position);

        // First verbatim spelling of each canonical claim, in member order
        let mut union_keys = BTreeSet::new();
        let mut union_claims = Vec::new();
        for member in &contributing {
            for (claim, key) in self.claims(member) {
                if union_keys.insert(key) {
                    union_claims.push(claim.to_string());
                }
            }
        }

        let agreeing = contributing
            .iter()
            .filter(|m| m.normalized.nationality_claims == union_keys)
            .count();

        Some(MergedField {
            value: FieldValue::Set(union_claims),
            confidence: agreeing as f64 / contributing.len() as f64,
            sources: source_list(&contributing),
        })
    }
}

/// Ordered strategies, one per merged field
pub struct StrategyTable {
    strategies: Vec<Box<dyn FieldStrategy>>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::new(&RecordNormalizer::default())
    }
}

impl StrategyTable {
    /// The built-in fields; claims are canonicalized with `normalizer`
    pub fn new(normalizer: &RecordNormalizer) -> Self {
        Self::empty()
            .with_strategy(Box::new(NameStrategy))
            .with_strategy(Box::new(DateStrategy))
            .with_strategy(Box::new(FreeTextStrategy::birth_place()))
            .with_strategy(Box::new(SetStrategy::new(normalizer.clone())))
            .with_strategy(Box::new(FreeTextStrategy::current_club()))
    }

    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Add a strategy, replacing any existing one for the same field
    pub fn with_strategy(mut self, strategy: Box<dyn FieldStrategy>) -> Self {
        self.strategies.retain(|s| s.field() != strategy.field());
        self.strategies.push(strategy);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn FieldStrategy> {
        self.strategies.iter().map(|s| s.as_ref())
    }
}
