use anyhow::{bail, Context, Result};
use pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment variables with this prefix override config values.
/// Nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "RADAR_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    /// Where `/ingest` writes its artifacts
    pub export_dir: PathBuf,
    /// Cap on rows read per input file
    pub max_rows: Option<usize>,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            cache: CacheConfig::default(),
            export_dir: PathBuf::from("data/export"),
            max_rows: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional file, then `RADAR_*` variables from the
    /// process environment. The pipeline section is validated last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, std::env::vars())
    }

    pub fn load_with(path: Option<&Path>, vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let mut value = serde_json::to_value(Self::default())?;

        if let Some(path) = path {
            let file_value = read_config_file(path)?;
            merge_values(&mut value, file_value);
        }
        apply_env_overrides(&mut value, vars);

        let config: AppConfig =
            serde_json::from_value(value).context("Configuration does not match the expected shape")?;
        config
            .pipeline
            .validate()
            .context("Invalid pipeline configuration")?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn read_config_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON config {}", path.display())),
        Some("toml") => toml::from_str(&text)
            .with_context(|| format!("Failed to parse TOML config {}", path.display())),
        _ => bail!("Unsupported config format: {}", path.display()),
    }
}

/// Deep merge: objects merge key by key, anything else is replaced
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(value: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    let mut overrides: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect();
    // Deterministic when two variables touch the same key
    overrides.sort();

    for (key, raw) in overrides {
        let path: Vec<String> = key[ENV_PREFIX.len()..]
            .split("__")
            .map(|segment| segment.to_lowercase())
            .collect();
        if path.iter().any(|segment| segment.is_empty()) {
            continue;
        }
        tracing::debug!(key = %key, "Applying environment override");
        set_path(value, &path, coerce(&raw));
    }
}

fn set_path(value: &mut Value, path: &[String], new_value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = value;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.clone(), new_value);
    }
}

fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(flag) = trimmed.parse::<bool>() {
        return Value::Bool(flag);
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    Value::String(raw.to_string())
}
