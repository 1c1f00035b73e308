use ingest::{CandidateRecord, RecordId, CURRENT_CLUB_FIELD};
use merge::entity::{BIRTH_DATE, BIRTH_PLACE, CURRENT_CLUB, FULL_NAME, NATIONALITY_CLAIMS};
use merge::FieldValue;
use pipeline::{Pipeline, PipelineConfig};
use resolve::{Clusterer, LinkageMode, RunBudget, SimilarityEdge};
use std::collections::{BTreeSet, HashMap};

fn pipeline_with_threshold(threshold: f64) -> Pipeline {
    let mut config = PipelineConfig::default();
    config.resolution.fuzzy_threshold = threshold;
    Pipeline::new(config).unwrap()
}

/// A roster big enough to leave the full-comparison fallback
fn roster() -> Vec<CandidateRecord> {
    let people = [
        ("Luiz Pereira", "1999-03-02", "São Paulo", "Italian"),
        ("Marco Rossi", "1990-07-11", "Rosario", "Italy"),
        ("Ana Costa", "2001-01-15", "Santos", "Portuguese"),
        ("Bruno Lima", "1995-05-05", "Recife", "Brazil"),
        ("Diego Martinez", "1998-12-24", "Buenos Aires", "Spain"),
        ("Kevin Schmidt", "1997-09-09", "Curitiba", "German"),
        ("Rafael Duarte", "1994-04-04", "Porto Alegre", "Portugal"),
        ("Tiago Ferreira", "2000-06-30", "Campinas", "Italian"),
        ("Joao Almeida", "1996-02-29", "Salvador", "Portugal"),
        ("Pablo Giordano", "1993-03-17", "Cordoba", "Italy"),
        ("Lucas Bianchi", "1999-08-21", "Florianopolis", "Italy"),
        ("Mateo Russo", "2002-10-10", "Montevideo", "Italian"),
    ];
    let spellings = |name: &str, variant: usize| -> String {
        match variant {
            0 => name.to_string(),
            1 => name.to_uppercase(),
            2 => name.replace('o', "ó"),
            3 => format!(" {name} "),
            _ => name.to_lowercase(),
        }
    };
    let date_formats = |iso: &str, variant: usize| -> String {
        let (y, rest) = iso.split_at(4);
        let (m, d) = (&rest[1..3], &rest[4..6]);
        match variant % 3 {
            0 => iso.to_string(),
            1 => format!("{d}/{m}/{y}"),
            _ => y.to_string(),
        }
    };

    let mut records = Vec::new();
    for (i, (name, date, place, claim)) in people.iter().enumerate() {
        for variant in 0..5 {
            let source = format!("feed-{}", (i + variant) % 4);
            let mut record = CandidateRecord::new(
                format!("r{i:02}-{variant}"),
                spellings(name, variant),
                source,
            )
            .with_birth_date(date_formats(date, variant))
            .with_birth_place(*place)
            .with_nationality_claim(*claim);
            if variant % 2 == 0 {
                record = record.with_raw_field(CURRENT_CLUB_FIELD, format!("Club {}", i % 3));
            }
            records.push(record);
        }
    }
    records
}

#[test]
fn scenario_a_spelling_variants_merge() {
    let records = vec![
        CandidateRecord::new("a", "Luiz Pereira", "feed-a")
            .with_birth_date("1999-03-02")
            .with_birth_place("São Paulo"),
        CandidateRecord::new("b", "Luis Pereira", "feed-b")
            .with_birth_date("1999-03-02")
            .with_birth_place("Sao Paulo"),
    ];

    let output = pipeline_with_threshold(0.8).run(records);

    assert_eq!(output.entities.len(), 1);
    let entity = &output.entities[0];
    for field in [FULL_NAME, BIRTH_DATE, BIRTH_PLACE] {
        let merged = entity.field(field).unwrap();
        assert!(merged.confidence >= 0.5, "{field}: {}", merged.confidence);
    }
    assert_eq!(entity.display_name, "Luiz Pereira");
}

#[test]
fn scenario_b_unknown_birth_date_is_not_penalized() {
    let records = vec![
        CandidateRecord::new("a", "Marco Rossi", "feed-a"),
        CandidateRecord::new("b", "Marco Rossi", "feed-b").with_birth_date("1990-07-11"),
    ];

    // Scoring the unknown date as 0 would give 0.75 and keep them apart
    let output = pipeline_with_threshold(0.85).run(records);

    assert_eq!(output.entities.len(), 1);
    assert_eq!(output.entities[0].text(BIRTH_DATE), Some("1990-07-11"));
    assert_eq!(output.entities[0].field(BIRTH_DATE).unwrap().confidence, 1.0);
}

#[test]
fn scenario_c_nickname_stays_apart_at_high_threshold() {
    let records = vec![
        CandidateRecord::new("a", "Giuseppe Rossi", "feed-a").with_birth_date("1987-02-01"),
        CandidateRecord::new("b", "Pepito Rossi", "feed-b").with_birth_date("1987-02-01"),
    ];

    let output = pipeline_with_threshold(0.95).run(records);

    assert_eq!(output.entities.len(), 2);
    assert!(output.entities.iter().all(|e| e.member_record_ids.len() == 1));
}

#[test]
fn scenario_d_transitive_chain() {
    let ids: Vec<RecordId> = ["a", "b", "c"].into_iter().map(RecordId::from).collect();
    let edges = [
        SimilarityEdge::new(RecordId::from("a"), RecordId::from("b"), 0.85),
        SimilarityEdge::new(RecordId::from("b"), RecordId::from("c"), 0.85),
        SimilarityEdge::new(RecordId::from("a"), RecordId::from("c"), 0.3),
    ];

    let chained = Clusterer::new(0.8, LinkageMode::ConnectedComponents).cluster(&ids, &edges);
    assert_eq!(chained.len(), 1);
    assert_eq!(chained[0].members, ids);

    // The stricter policy refuses the chain
    let strict = Clusterer::new(0.8, LinkageMode::CompleteLinkage).cluster(&ids, &edges);
    assert_eq!(strict.len(), 2);
}

#[test]
fn runs_are_byte_identical() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let first = pipeline.run(roster());
    let second = pipeline.run(roster());

    assert_eq!(first.graph_export, second.graph_export);
    assert_eq!(
        serde_json::to_string(&first.entities).unwrap(),
        serde_json::to_string(&second.entities).unwrap()
    );
    assert_eq!(first.audit, second.audit);
}

#[test]
fn clusters_partition_the_input() {
    let records = roster();
    let input: BTreeSet<RecordId> = records.iter().map(|r| r.id.clone()).collect();
    let output = Pipeline::new(PipelineConfig::default()).unwrap().run(records);

    let mut seen = BTreeSet::new();
    for entity in &output.entities {
        for id in &entity.member_record_ids {
            assert!(seen.insert(id.clone()), "{id} is in two entities");
        }
    }
    assert_eq!(seen, input);
    // Blocking was in effect
    assert!(output.stats.resolution.blocks > 1);
}

#[test]
fn roster_collapses_to_one_entity_per_person() {
    let output = Pipeline::new(PipelineConfig::default()).unwrap().run(roster());
    assert_eq!(output.entities.len(), 12);
}

#[test]
fn merged_values_trace_to_member_records() {
    let records = roster();
    let by_id: HashMap<RecordId, CandidateRecord> =
        records.iter().map(|r| (r.id.clone(), r.clone())).collect();
    let output = Pipeline::new(PipelineConfig::default()).unwrap().run(records);

    for entity in &output.entities {
        let members: Vec<&CandidateRecord> = entity.member_record_ids.iter().map(|id| &by_id[id]).collect();
        for (field, merged) in &entity.merged_fields {
            match &merged.value {
                FieldValue::Text(value) => {
                    let found = members.iter().any(|m| {
                        let candidate = match field.as_str() {
                            FULL_NAME => Some(m.full_name.as_str()),
                            BIRTH_DATE => m.birth_date.as_deref(),
                            BIRTH_PLACE => m.birth_place.as_deref(),
                            CURRENT_CLUB => m.current_club(),
                            _ => None,
                        };
                        candidate == Some(value.as_str())
                    });
                    assert!(found, "{field} = {value:?} not found in members");
                }
                FieldValue::Set(values) => {
                    assert_eq!(field, NATIONALITY_CLAIMS);
                    for value in values {
                        assert!(members.iter().any(|m| m.nationality_claims.contains(value)));
                    }
                }
            }
            for source in &merged.sources {
                assert!(members.iter().any(|m| &m.source_id == source));
            }
        }
    }
}

#[test]
fn graph_statements_are_unique() {
    let output = Pipeline::new(PipelineConfig::default()).unwrap().run(roster());

    let statements: Vec<&str> = output
        .graph_export
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with("@prefix"))
        .collect();
    let unique: BTreeSet<&str> = statements.iter().copied().collect();
    assert_eq!(unique.len(), statements.len());

    // One observation statement per distinct contributing source
    for entity in &output.entities {
        let subject = format!("entity:{} radar:mentionedIn ", entity.entity_id);
        let observed = statements.iter().filter(|s| s.starts_with(&subject)).count();
        assert_eq!(observed, entity.member_source_ids.len());
    }
}

#[test]
fn low_confidence_merges_are_audited_not_dropped() {
    let records = vec![
        CandidateRecord::new("a", "Ana Costa", "s1").with_birth_place("Santos"),
        CandidateRecord::new("b", "Ana Costa", "s2").with_birth_place("Recife"),
        CandidateRecord::new("c", "Ana Costa", "s3").with_birth_place("Natal"),
    ];
    let output = pipeline_with_threshold(0.8).run(records);

    assert_eq!(output.entities.len(), 1);
    let flagged: Vec<_> = output.needs_review().collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].low_confidence_fields, vec![BIRTH_PLACE.to_string()]);
    assert_eq!(output.stats.low_confidence_entities, 1);
}

#[test]
fn block_budget_yields_a_valid_prefix() {
    let full = Pipeline::new(PipelineConfig::default()).unwrap().run(roster());

    let mut config = PipelineConfig::default();
    config.budget = RunBudget::unlimited().with_max_blocks(2);
    let partial = Pipeline::new(config).unwrap().run(roster());

    assert!(!partial.complete);
    assert!(partial.entities.len() < full.entities.len());
    let full_ids: BTreeSet<&str> = full.entities.iter().map(|e| e.entity_id.as_str()).collect();
    for entity in &partial.entities {
        assert!(full_ids.contains(entity.entity_id.as_str()));
    }
}

#[test]
fn cancelled_run_still_returns_output() {
    let cancel = resolve::CancelFlag::new();
    cancel.cancel();
    let output = Pipeline::new(PipelineConfig::default())
        .unwrap()
        .run_with(roster(), &cancel);

    assert!(!output.complete);
    assert!(output.entities.is_empty());
}

#[test]
fn non_latin_duplicates_merge_in_a_blocked_corpus() {
    let mut records = roster();
    assert!(records.len() >= PipelineConfig::default().resolution.full_comparison_below);
    for (id, source) in [("x1", "feed-ru-1"), ("x2", "feed-ru-2")] {
        records.push(CandidateRecord::new(id, "Иван Петров", source).with_birth_date("1990-01-01"));
    }

    let output = Pipeline::new(PipelineConfig::default()).unwrap().run(records);

    assert!(output.complete);
    let holding: Vec<_> = output
        .entities
        .iter()
        .filter(|e| {
            e.member_record_ids
                .iter()
                .any(|id| id.as_str() == "x1" || id.as_str() == "x2")
        })
        .collect();
    assert_eq!(holding.len(), 1);
    assert_eq!(holding[0].member_record_ids.len(), 2);
    assert_eq!(holding[0].display_name, "Иван Петров");
    assert_eq!(output.entities.len(), 13);
}

#[test]
fn surname_only_record_merges_with_full_name() {
    let records = vec![
        CandidateRecord::new("a", "Marco Rossi", "feed-a")
            .with_birth_date("1990-07-11")
            .with_birth_place("Rosario"),
        CandidateRecord::new("b", "Rossi", "feed-b")
            .with_birth_date("1990-07-11")
            .with_birth_place("Rosario"),
    ];
    let output = Pipeline::new(PipelineConfig::default()).unwrap().run(records);

    assert_eq!(output.entities.len(), 1);
    // Equal frequency: the first occurrence wins
    assert_eq!(output.entities[0].display_name, "Marco Rossi");
}
