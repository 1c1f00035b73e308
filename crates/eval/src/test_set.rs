use ingest::{CandidateRecord, RecordId, CURRENT_CLUB_FIELD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ground truth for one real player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: &'static str,
    pub birth_date: &'static str,
    pub birth_place: &'static str,
    pub nationality: &'static str,
    pub club: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub record: CandidateRecord,
    /// Index into `PEOPLE`
    pub person: usize,
}

// Near-duplicate names are deliberate: they are the false-merge traps
pub const PEOPLE: &[Person] = &[
    Person { name: "Luiz Pereira", birth_date: "1999-03-02", birth_place: "São Paulo", nationality: "Italian", club: "Palmeiras" },
    Person { name: "Luiz Pereira", birth_date: "1988-11-20", birth_place: "Recife", nationality: "Portuguese", club: "Sport Recife" },
    Person { name: "Marco Rossi", birth_date: "1990-07-11", birth_place: "Rosario", nationality: "Italy", club: "Newell's Old Boys" },
    Person { name: "Mario Rossi", birth_date: "1993-01-05", birth_place: "Córdoba", nationality: "Italy", club: "Talleres" },
    Person { name: "Ana Costa", birth_date: "2001-01-15", birth_place: "Santos", nationality: "Portuguese", club: "Santos" },
    Person { name: "Bruno Lima", birth_date: "1995-05-05", birth_place: "Recife", nationality: "Italian", club: "Náutico" },
    Person { name: "Diego Martínez", birth_date: "1998-12-24", birth_place: "Buenos Aires", nationality: "Spanish", club: "Boca Juniors" },
    Person { name: "Diego Martins", birth_date: "1997-02-14", birth_place: "Porto Alegre", nationality: "Portuguese", club: "Grêmio" },
    Person { name: "Kevin Schmidt", birth_date: "1997-09-09", birth_place: "Curitiba", nationality: "German", club: "Coritiba" },
    Person { name: "Rafael Duarte", birth_date: "1994-04-04", birth_place: "Porto Alegre", nationality: "Portugal", club: "Internacional" },
    Person { name: "Tiago Ferreira", birth_date: "2000-06-30", birth_place: "Campinas", nationality: "Italian", club: "Guarani" },
    Person { name: "João Almeida", birth_date: "1996-02-29", birth_place: "Salvador", nationality: "Portugal", club: "Bahia" },
    Person { name: "Pablo Giordano", birth_date: "1993-03-17", birth_place: "Córdoba", nationality: "Italy", club: "Belgrano" },
    Person { name: "Lucas Bianchi", birth_date: "1999-08-21", birth_place: "Florianópolis", nationality: "Italy", club: "Avaí" },
    Person { name: "Luca Bianco", birth_date: "2002-04-18", birth_place: "Montevideo", nationality: "Italian", club: "Peñarol" },
    Person { name: "Mateo Russo", birth_date: "2002-10-10", birth_place: "Montevideo", nationality: "Italian", club: "Nacional" },
];

const SOURCES: &[&str] = &["scouting-feed", "registry", "search-scrape", "roster-history"];

/// `copies` noisy observations of every person, reproducible per seed
pub fn labeled_records(seed: u64, copies: usize) -> Vec<LabeledRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(PEOPLE.len() * copies);

    for (person_idx, person) in PEOPLE.iter().enumerate() {
        for copy in 0..copies {
            let source = SOURCES[rng.gen_range(0..SOURCES.len())];
            let id = format!("p{person_idx:02}-c{copy}");
            let mut record = CandidateRecord::new(id, noisy_name(person.name, &mut rng), source);

            if !rng.gen_bool(0.2) {
                record = record.with_birth_date(noisy_date(person.birth_date, &mut rng));
            }
            if !rng.gen_bool(0.25) {
                record = record.with_birth_place(noisy_text(person.birth_place, &mut rng));
            }
            if rng.gen_bool(0.6) {
                record = record.with_nationality_claim(person.nationality);
            }
            if rng.gen_bool(0.5) {
                record = record.with_raw_field(CURRENT_CLUB_FIELD, person.club);
            }
            records.push(LabeledRecord {
                record,
                person: person_idx,
            });
        }
    }
    records
}

pub fn get_test_set() -> Vec<LabeledRecord> {
    labeled_records(42, 5)
}

pub fn labels(records: &[LabeledRecord]) -> HashMap<RecordId, usize> {
    records
        .iter()
        .map(|l| (l.record.id.clone(), l.person))
        .collect()
}

fn noisy_name(name: &str, rng: &mut StdRng) -> String {
    match rng.gen_range(0..6) {
        0 => name.to_uppercase(),
        1 => strip_accents(name),
        2 => typo(name, rng),
        3 => format!("  {name}"),
        _ => name.to_string(),
    }
}

fn noisy_text(text: &str, rng: &mut StdRng) -> String {
    match rng.gen_range(0..4) {
        0 => strip_accents(text),
        1 => text.to_lowercase(),
        _ => text.to_string(),
    }
}

fn noisy_date(iso: &str, rng: &mut StdRng) -> String {
    let (year, rest) = iso.split_at(4);
    let (month, day) = (&rest[1..3], &rest[4..6]);
    match rng.gen_range(0..5) {
        0 => format!("{day}/{month}/{year}"),
        1 => year.to_string(),
        2 => format!("{day}.{month}.{year}"),
        _ => iso.to_string(),
    }
}

fn strip_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'ã' | 'â' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            c => c,
        })
        .collect()
}

/// Swap two adjacent letters of the last token
fn typo(name: &str, rng: &mut StdRng) -> String {
    let mut chars: Vec<char> = name.chars().collect();
    let start = name.rfind(' ').map(|i| name[..i].chars().count() + 1).unwrap_or(0);
    if chars.len() < start + 3 {
        return name.to_string();
    }
    let i = rng.gen_range(start + 1..chars.len() - 1);
    chars.swap(i, i + 1);
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_records() {
        let a = labeled_records(7, 3);
        let b = labeled_records(7, 3);
        assert_eq!(a.len(), PEOPLE.len() * 3);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.record, y.record);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let records = get_test_set();
        assert_eq!(labels(&records).len(), records.len());
    }

    #[test]
    fn test_typo_keeps_first_name() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let noisy = typo("Marco Rossi", &mut rng);
            assert!(noisy.starts_with("Marco R"));
            assert_eq!(noisy.len(), "Marco Rossi".len());
        }
    }
}
