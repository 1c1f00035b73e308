use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::record::{generate_record_id, CandidateRecord, CURRENT_CLUB_FIELD};

const NAME_KEYS: &[&str] = &["full_name", "player.full_name", "player_name", "name"];
const BIRTH_DATE_KEYS: &[&str] = &["birth_date", "player.birth_date", "date_of_birth"];
const BIRTH_PLACE_KEYS: &[&str] = &["birth_place", "player.birth_place", "place_of_birth"];
const NATIONALITY_KEYS: &[&str] = &[
    "nationality_claims",
    "nationalities",
    "player.nationalities",
    "nationality",
];
const SOURCE_KEYS: &[&str] = &["source_id", "article.url", "source_url", "url"];
const CLUB_KEYS: &[&str] = &["current_club", "player.current_club", "club"];

/// Keys consumed by the record model; never copied into `raw_fields`
const IGNORED_KEYS: &[&str] = &["id", "__metadata__"];

const SUPPORTED_EXTENSIONS: &[&str] = &["json", "jsonl", "csv"];

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordReader {
    max_rows: Option<usize>,
}

impl RecordReader {
    pub fn new(max_rows: Option<usize>) -> Self {
        Self { max_rows }
    }

    pub async fn read_file(&self, path: &Path) -> Result<Vec<CandidateRecord>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;
        let origin = path.to_string_lossy().to_string();

        let records = match extension.as_str() {
            "json" => self.parse_json(&origin, &content)?,
            "jsonl" => self.parse_json_lines(&origin, &content),
            "csv" => self.parse_csv(&origin, &content)?,
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        };

        debug!(path = %origin, records = records.len(), "Read candidate records");
        Ok(records)
    }

    /// Read every supported file below `dir`, in sorted path order
    pub async fn read_directory(&self, dir: &Path) -> Result<Vec<CandidateRecord>> {
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_supported(path))
            .collect();
        paths.sort();

        let mut records = Vec::new();
        for path in paths {
            records.extend(self.read_file(&path).await?);
        }
        Ok(records)
    }

    pub fn parse_json(&self, origin: &str, content: &str) -> Result<Vec<CandidateRecord>> {
        let value: Value = serde_json::from_str(content)
            .context(format!("Failed to parse JSON records from {}", origin))?;

        // Registries answer either with a bare array or with {"results": [...]}
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("results") {
                Some(Value::Array(items)) => items,
                _ => anyhow::bail!("Expected an array of records in {}", origin),
            },
            _ => anyhow::bail!("Expected an array of records in {}", origin),
        };

        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .take(self.limit())
            .enumerate()
            .map(|(ordinal, map)| record_from_map(origin, ordinal, map))
            .collect())
    }

    pub fn parse_json_lines(&self, origin: &str, content: &str) -> Vec<CandidateRecord> {
        let mut maps = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(map)) => maps.push(map),
                Ok(_) => warn!(origin, line = line_no + 1, "Skipping non-object JSON line"),
                Err(e) => warn!(origin, line = line_no + 1, error = %e, "Skipping malformed JSON line"),
            }
            if maps.len() >= self.limit() {
                break;
            }
        }

        maps.into_iter()
            .enumerate()
            .map(|(ordinal, map)| record_from_map(origin, ordinal, map))
            .collect()
    }

    pub fn parse_csv(&self, origin: &str, content: &str) -> Result<Vec<CandidateRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .context(format!("Failed to read CSV header from {}", origin))?
            .clone();

        let mut records = Vec::new();
        for (ordinal, row) in reader.records().enumerate() {
            if records.len() >= self.limit() {
                break;
            }
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(origin, row = ordinal + 1, error = %e, "Skipping malformed CSV row");
                    continue;
                }
            };

            let map: Map<String, Value> = headers
                .iter()
                .zip(row.iter())
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect();
            records.push(record_from_map(origin, ordinal, map));
        }

        Ok(records)
    }

    fn limit(&self) -> usize {
        self.max_rows.unwrap_or(usize::MAX)
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Map a loosely-keyed object onto the record model.
///
/// Never fails: missing values stay `None`, anything unrecognized lands in
/// `raw_fields`.
pub fn record_from_map(origin: &str, ordinal: usize, mut map: Map<String, Value>) -> CandidateRecord {
    let full_name = take_text(&mut map, NAME_KEYS).unwrap_or_default();
    let birth_date = take_text(&mut map, BIRTH_DATE_KEYS);
    let birth_place = take_text(&mut map, BIRTH_PLACE_KEYS);
    let nationality_claims = take_claims(&mut map, NATIONALITY_KEYS);
    let source_id = take_text(&mut map, SOURCE_KEYS).unwrap_or_else(|| origin.to_string());
    let club = take_text(&mut map, CLUB_KEYS);

    let id = generate_record_id(&format!("{}|{}", origin, source_id), ordinal, &full_name);
    let mut record = CandidateRecord::new(id, full_name, source_id);
    record.birth_date = birth_date;
    record.birth_place = birth_place;
    record.nationality_claims = nationality_claims;
    if let Some(club) = club {
        record.raw_fields.insert(CURRENT_CLUB_FIELD.to_string(), club);
    }

    for (key, value) in map {
        if IGNORED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if let Some(text) = value_to_text(&value) {
            record.raw_fields.insert(key, text);
        }
    }

    record
}

fn take_text(map: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let mut found = None;
    for key in keys {
        if let Some(value) = map.remove(*key) {
            if found.is_none() {
                found = value_to_text(&value).filter(|s| !s.trim().is_empty());
            }
        }
    }
    found.map(|s| s.trim().to_string())
}

fn take_claims(map: &mut Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let mut claims = Vec::new();
    for key in keys {
        match map.remove(*key) {
            Some(Value::Array(items)) => {
                claims.extend(items.iter().filter_map(value_to_text));
            }
            Some(Value::String(text)) => {
                claims.extend(text.split([';', ',']).map(|s| s.to_string()));
            }
            _ => {}
        }
    }
    claims
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
