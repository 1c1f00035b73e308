use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ingest::CandidateRecord;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use unicode_segmentation::UnicodeSegmentation;

use crate::locale::LocaleTable;
use crate::schema::{BirthDate, NormalizedRecord, Place};

/// Characters that join rather than separate words ("D'Alessandro", "Jr.")
static JOINERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.'’`´]").unwrap());

static YEAR_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})$").unwrap());

/// Day-first before month-first: "12/05/2004" is 12 May
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Fold text into a token sequence: strip diacritics, lowercase,
/// drop joiners, split on word boundaries.
pub fn fold_tokens(text: &str) -> Vec<String> {
    let stripped: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    let joined = JOINERS.replace_all(&stripped, "");

    joined.unicode_words().map(|w| w.to_string()).collect()
}

/// Folded single-line form of `text` ("  São   Paulo " -> "sao paulo")
pub fn fold_text(text: &str) -> String {
    fold_tokens(text).join(" ")
}

/// Parse a free-text date; never fails, unparseable input is `Unknown`
pub fn parse_date(text: &str) -> BirthDate {
    let text = text.trim();
    if text.is_empty() {
        return BirthDate::Unknown;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return BirthDate::Known(date);
        }
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return BirthDate::Known(timestamp.date_naive());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return BirthDate::Known(timestamp.date());
    }

    if let Some(caps) = YEAR_ONLY.captures(text) {
        if let Ok(year) = caps[1].parse::<i32>() {
            return BirthDate::Year(year);
        }
    }

    BirthDate::Unknown
}

/// Canonicalizes raw candidate records. Pure: output depends only on the
/// record and the locale table supplied at construction.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    locale: LocaleTable,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(LocaleTable::default())
    }
}

impl RecordNormalizer {
    pub fn new(locale: LocaleTable) -> Self {
        Self {
            locale: locale.into_folded(),
        }
    }

    pub fn locale(&self) -> &LocaleTable {
        &self.locale
    }

    pub fn normalize(&self, record: &CandidateRecord) -> NormalizedRecord {
        let name_tokens = fold_tokens(&record.full_name);

        NormalizedRecord {
            id: record.id.clone(),
            source_id: record.source_id.clone(),
            folded_name: name_tokens.join(" "),
            name_tokens,
            birth_date: record
                .birth_date
                .as_deref()
                .map(parse_date)
                .unwrap_or(BirthDate::Unknown),
            birth_place: self.normalize_place(record.birth_place.as_deref()),
            nationality_claims: self.normalize_claims(&record.nationality_claims),
            club: record
                .current_club()
                .map(fold_text)
                .filter(|club| !club.is_empty()),
        }
    }

    pub fn normalize_place(&self, place: Option<&str>) -> Place {
        match place.map(fold_text) {
            Some(folded) if !folded.is_empty() => Place::Known(self.locale.canonical_place(&folded)),
            _ => Place::Unknown,
        }
    }

    pub fn normalize_claim(&self, claim: &str) -> Option<String> {
        let folded = fold_text(claim);
        if folded.is_empty() {
            None
        } else {
            Some(self.locale.canonical_nationality(&folded))
        }
    }

    pub fn normalize_claims(&self, claims: &[String]) -> BTreeSet<String> {
        claims
            .iter()
            .filter_map(|claim| self.normalize_claim(claim))
            .collect()
    }
}
