mod cache;
mod config;
mod metrics;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use pipeline::{Pipeline, RunOutput};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::{CacheStats, ResultCache};
use crate::config::{AppConfig, LoggingConfig};
use crate::metrics::{Metrics, MetricsSnapshot, TimedOperation};

struct AppState {
    pipeline: Arc<Pipeline>,
    cache: Option<ResultCache<ResolveResponse>>,
    metrics: Arc<Metrics>,
    export_dir: PathBuf,
    max_rows: Option<usize>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct ResolveRequest {
    /// Raw record objects, in any of the shapes the file readers accept
    records: Vec<Map<String, Value>>,
    /// Fallback source id for records that carry none
    #[serde(default)]
    source: Option<String>,
}

#[derive(Clone, Serialize)]
struct ResolveResponse {
    run_id: Uuid,
    cached: bool,
    /// Run that computed a cached result
    #[serde(skip_serializing_if = "Option::is_none")]
    served_from: Option<Uuid>,
    #[serde(flatten)]
    output: RunOutput,
}

#[derive(Deserialize)]
struct IngestRequest {
    path: String,
    max_rows: Option<usize>,
}

#[derive(Serialize)]
struct IngestResponse {
    run_id: Uuid,
    records_read: usize,
    entities: usize,
    low_confidence_entities: usize,
    complete: bool,
    entities_path: String,
    audit_path: String,
    graph_path: String,
}

#[derive(Serialize)]
struct StatsResponse {
    metrics: MetricsSnapshot,
    cache: Option<CacheStats>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional config file as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    init_tracing(&config.logging);

    let pipeline = Pipeline::new(config.pipeline.clone()).context("Failed to build pipeline")?;
    let state = AppState {
        pipeline: Arc::new(pipeline),
        cache: config
            .cache
            .enabled
            .then(|| ResultCache::new(config.cache.max_entries)),
        metrics: Metrics::new(),
        export_dir: config.export_dir.clone(),
        max_rows: config.max_rows,
    };

    let app = router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    info!(address = %address, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let level = logging
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    let builder = tracing_subscriber::fmt().with_max_level(level);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/resolve", post(resolve_records))
        .route("/ingest", post(ingest_records))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn resolve_records(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ResolveResponse>, StatusCode> {
    let result = resolve_body(&state, &body).await;
    state.metrics.record_request(result.is_ok());
    result.map(Json)
}

async fn resolve_body(state: &AppState, body: &[u8]) -> Result<ResolveResponse, StatusCode> {
    let key = ResultCache::<ResolveResponse>::key_for(body);
    if let Some(hit) = state.cache.as_ref().and_then(|cache| cache.get(&key)) {
        // Every request gets its own run id; the original is kept for tracing
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, served_from = %hit.run_id, "Served resolve request from cache");
        return Ok(ResolveResponse {
            run_id,
            cached: true,
            served_from: Some(hit.run_id),
            output: hit.output,
        });
    }

    let request: ResolveRequest = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Rejected resolve request");
        StatusCode::BAD_REQUEST
    })?;

    let origin = request.source.unwrap_or_else(|| "request".to_string());
    let records = request
        .records
        .into_iter()
        .enumerate()
        .map(|(ordinal, map)| ingest::record_from_map(&origin, ordinal, map))
        .collect();

    let output = run_pipeline(state, records).await?;
    let response = ResolveResponse {
        run_id: Uuid::new_v4(),
        cached: false,
        served_from: None,
        output,
    };

    if let Some(cache) = &state.cache {
        cache.insert(key, response.clone());
    }
    Ok(response)
}

async fn ingest_records(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, StatusCode> {
    let result = ingest_path(&state, req).await;
    state.metrics.record_request(result.is_ok());
    result.map(Json)
}

async fn ingest_path(state: &AppState, req: IngestRequest) -> Result<IngestResponse, StatusCode> {
    let path = PathBuf::from(&req.path);
    if !path.exists() {
        return Err(StatusCode::NOT_FOUND);
    }

    let records = ingest::ingest_path(&path, req.max_rows.or(state.max_rows))
        .await
        .map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to read records");
            StatusCode::UNPROCESSABLE_ENTITY
        })?;
    let records_read = records.len();

    let output = run_pipeline(state, records).await?;
    let run_id = Uuid::new_v4();

    let exports = write_exports(&state.export_dir, &output).await.map_err(|e| {
        error!(run_id = %run_id, error = %e, "Failed to write exports");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    info!(
        run_id = %run_id,
        records = records_read,
        entities = output.stats.entities,
        export_dir = %state.export_dir.display(),
        "Ingest run exported"
    );

    Ok(IngestResponse {
        run_id,
        records_read,
        entities: output.stats.entities,
        low_confidence_entities: output.stats.low_confidence_entities,
        complete: output.complete,
        entities_path: exports.entities.display().to_string(),
        audit_path: exports.audit.display().to_string(),
        graph_path: exports.graph.display().to_string(),
    })
}

async fn run_pipeline(state: &AppState, records: Vec<ingest::CandidateRecord>) -> Result<RunOutput, StatusCode> {
    let pipeline = Arc::clone(&state.pipeline);
    let timer = TimedOperation::start();

    // Resolution is CPU-bound; keep it off the async workers
    let output = tokio::task::spawn_blocking(move || pipeline.run(records))
        .await
        .map_err(|e| {
            error!(error = %e, "Pipeline task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    state.metrics.record_run(timer.elapsed(), &output);
    Ok(output)
}

struct ExportPaths {
    entities: PathBuf,
    audit: PathBuf,
    graph: PathBuf,
}

async fn write_exports(dir: &Path, output: &RunOutput) -> anyhow::Result<ExportPaths> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let paths = ExportPaths {
        entities: dir.join("resolved_entities.json"),
        audit: dir.join("audit.json"),
        graph: dir.join("graph.ttl"),
    };

    tokio::fs::write(&paths.entities, serde_json::to_string_pretty(&output.entities)?)
        .await
        .with_context(|| format!("Failed to write {}", paths.entities.display()))?;
    tokio::fs::write(&paths.audit, serde_json::to_string_pretty(&output.audit)?)
        .await
        .with_context(|| format!("Failed to write {}", paths.audit.display()))?;
    tokio::fs::write(&paths.graph, &output.graph_export)
        .await
        .with_context(|| format!("Failed to write {}", paths.graph.display()))?;

    Ok(paths)
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        metrics: state.metrics.snapshot(),
        cache: state.cache.as_ref().map(|cache| cache.stats()),
    })
}
