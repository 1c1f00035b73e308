use ingest::RecordId;
use normalize::{BirthDate, NormalizedRecord, Place};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::config::FieldWeights;

/// Credit for two dates that agree on the year only
pub const SAME_YEAR_CREDIT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    BirthDate,
    BirthPlace,
    NationalityOverlap,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Name,
        Field::BirthDate,
        Field::BirthPlace,
        Field::NationalityOverlap,
    ];

    pub fn weight_key(&self) -> &'static str {
        match self {
            Field::Name => "name_weight",
            Field::BirthDate => "birth_date_weight",
            Field::BirthPlace => "birth_place_weight",
            Field::NationalityOverlap => "nationality_overlap_weight",
        }
    }
}

/// Pairwise score between two records. `a < b` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub a: RecordId,
    pub b: RecordId,
    pub score: f64,
    /// Weighted contribution of each field that was known on both sides
    pub breakdown: BTreeMap<Field, f64>,
}

impl SimilarityEdge {
    pub fn new(a: RecordId, b: RecordId, score: f64) -> Self {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Self {
            a,
            b,
            score,
            breakdown: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    weights: FieldWeights,
}

impl SimilarityEngine {
    pub fn new(weights: FieldWeights) -> Self {
        Self { weights }
    }

    pub fn compare(&self, a: &NormalizedRecord, b: &NormalizedRecord) -> SimilarityEdge {
        let present = field_similarities(a, b);
        let total_weight: f64 = present
            .iter()
            .map(|(field, _)| self.weights.weight(*field))
            .sum();

        let mut edge = SimilarityEdge::new(a.id.clone(), b.id.clone(), 0.0);
        if total_weight <= 0.0 {
            return edge;
        }

        for (field, similarity) in present {
            let contribution = self.weights.weight(field) * similarity / total_weight;
            edge.breakdown.insert(field, contribution);
            edge.score += contribution;
        }
        edge.score = edge.score.clamp(0.0, 1.0);
        edge
    }
}

/// Similarity of every field known on both sides. Unknown fields are left
/// out entirely so missing data never pulls a pair apart.
pub fn field_similarities(a: &NormalizedRecord, b: &NormalizedRecord) -> Vec<(Field, f64)> {
    let candidates = [
        (Field::Name, name_similarity(&a.name_tokens, &b.name_tokens)),
        (Field::BirthDate, birth_date_similarity(&a.birth_date, &b.birth_date)),
        (Field::BirthPlace, birth_place_similarity(&a.birth_place, &b.birth_place)),
        (
            Field::NationalityOverlap,
            nationality_overlap(&a.nationality_claims, &b.nationality_claims),
        ),
    ];

    candidates
        .into_iter()
        .filter_map(|(field, similarity)| similarity.map(|s| (field, s)))
        .collect()
}

pub fn name_similarity(a: &[String], b: &[String]) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b || a.concat() == b.concat() {
        return Some(1.0);
    }

    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    // A contiguous token run of the other name is an alias ("rossi" in "marco rossi")
    if longer.windows(shorter.len()).any(|w| w == shorter) {
        return Some(1.0);
    }

    let best_match = |from: &[String], to: &[String]| -> f64 {
        from.iter()
            .map(|t| to.iter().map(|u| jaro_winkler(t, u)).fold(0.0, f64::max))
            .sum()
    };
    let score = (best_match(a, b) + best_match(b, a)) / (a.len() + b.len()) as f64;
    Some(score.clamp(0.0, 1.0))
}

pub fn birth_date_similarity(a: &BirthDate, b: &BirthDate) -> Option<f64> {
    match (a, b) {
        (BirthDate::Unknown, _) | (_, BirthDate::Unknown) => None,
        (BirthDate::Known(x), BirthDate::Known(y)) if x == y => Some(1.0),
        _ if a.year() == b.year() => Some(SAME_YEAR_CREDIT),
        _ => Some(0.0),
    }
}

pub fn birth_place_similarity(a: &Place, b: &Place) -> Option<f64> {
    let (a, b) = (a.as_known()?, b.as_known()?);
    if a == b {
        Some(1.0)
    } else {
        Some(normalized_levenshtein(a, b))
    }
}

/// Jaccard overlap of the claim sets; unknown when either side has none
pub fn nationality_overlap(
    a: &std::collections::BTreeSet<String>,
    b: &std::collections::BTreeSet<String>,
) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    Some(intersection as f64 / union as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::CandidateRecord;
    use normalize::RecordNormalizer;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(|t| t.to_string()).collect()
    }

    fn normalized(record: CandidateRecord) -> NormalizedRecord {
        RecordNormalizer::default().normalize(&record)
    }

    #[test]
    fn test_name_similarity_exact_and_alias() {
        assert_eq!(name_similarity(&tokens("marco de rossi"), &tokens("marco de rossi")), Some(1.0));
        assert_eq!(name_similarity(&tokens("marco derossi"), &tokens("marco de rossi")), Some(1.0));
        assert_eq!(
            name_similarity(&tokens("daniele de rossi"), &tokens("de rossi")),
            Some(1.0)
        );
        assert_eq!(name_similarity(&[], &tokens("de rossi")), None);
    }

    #[test]
    fn test_name_similarity_is_symmetric() {
        let a = tokens("luiz pereira");
        let b = tokens("luis pereira da silva");
        let ab = name_similarity(&a, &b).unwrap();
        let ba = name_similarity(&b, &a).unwrap();

        assert!((ab - ba).abs() < 1e-12);
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn test_contained_token_run_is_an_alias() {
        assert_eq!(name_similarity(&tokens("rossi"), &tokens("marco rossi")), Some(1.0));
        assert_eq!(name_similarity(&tokens("marco rossi"), &tokens("rossi")), Some(1.0));
        assert_eq!(name_similarity(&tokens("pereira"), &tokens("luis pereira da silva")), Some(1.0));
        // Tokens must be contiguous and whole
        assert!(name_similarity(&tokens("marco silva"), &tokens("marco rossi silva")).unwrap() < 1.0);
        assert!(name_similarity(&tokens("ross"), &tokens("marco rossi")).unwrap() < 1.0);
    }

    #[test]
    fn test_birth_date_partial_credit() {
        let a = normalize::parse_date("1999-03-02");
        let b = normalize::parse_date("1999-07-15");
        let c = normalize::parse_date("2001-03-02");

        assert_eq!(birth_date_similarity(&a, &a), Some(1.0));
        assert_eq!(birth_date_similarity(&a, &b), Some(SAME_YEAR_CREDIT));
        assert_eq!(birth_date_similarity(&a, &BirthDate::Year(1999)), Some(SAME_YEAR_CREDIT));
        assert_eq!(birth_date_similarity(&a, &c), Some(0.0));
        assert_eq!(birth_date_similarity(&a, &BirthDate::Unknown), None);
    }

    #[test]
    fn test_nationality_jaccard() {
        let a = ["italy", "brazil"].iter().map(|s| s.to_string()).collect();
        let b = ["italy"].iter().map(|s| s.to_string()).collect();
        assert_eq!(nationality_overlap(&a, &b), Some(0.5));
        assert_eq!(nationality_overlap(&a, &Default::default()), None);
    }

    #[test]
    fn test_unknown_birth_date_is_excluded_not_penalized() {
        let engine = SimilarityEngine::new(FieldWeights::default());
        let known = normalized(
            CandidateRecord::new("a", "Marco De Rossi", "s1")
                .with_birth_date("2004-05-12")
                .with_birth_place("Buenos Aires"),
        );
        let unknown = normalized(
            CandidateRecord::new("b", "Marco De Rossi", "s2")
                .with_birth_date("??")
                .with_birth_place("Buenos Aires"),
        );

        let edge = engine.compare(&known, &unknown);
        assert!(!edge.breakdown.contains_key(&Field::BirthDate));
        assert!((edge.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_breakdown_sums_to_score() {
        let engine = SimilarityEngine::new(FieldWeights::default());
        let a = normalized(
            CandidateRecord::new("b", "Luiz Pereira", "s1")
                .with_birth_date("1999-03-02")
                .with_birth_place("São Paulo"),
        );
        let b = normalized(
            CandidateRecord::new("a", "Luis Pereira", "s2")
                .with_birth_date("1999-03-02")
                .with_birth_place("Sao Paulo"),
        );

        let edge = engine.compare(&a, &b);
        assert_eq!(edge.a.as_str(), "a");
        let sum: f64 = edge.breakdown.values().sum();
        assert!((sum - edge.score).abs() < 1e-9);
        assert!(edge.score >= 0.8);
    }
}
