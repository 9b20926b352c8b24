use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use kb_core::persist::load_index;
use kb_core::{Error, Hit, QueryEngine, DEFAULT_TOP_K};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<Hit>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub documents: Option<u32>,
    pub built_at: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub index_path: PathBuf,
    /// Swapped wholesale on reload; requests keep the engine they started with.
    pub engine: Arc<RwLock<Option<Arc<QueryEngine>>>>,
    pub admin_token: Option<String>,
}

fn load_engine(path: &Path) -> kb_core::Result<Arc<QueryEngine>> {
    let index = load_index(path)?;
    tracing::info!(documents = index.num_docs, built_at = %index.built_at, "loaded index");
    Ok(Arc::new(QueryEngine::new(Arc::new(index))))
}

impl AppState {
    /// Load the snapshot at `index_path`. A missing snapshot is served as 503
    /// until `/reload`; a corrupt one is an error.
    pub fn load(index_path: impl Into<PathBuf>, admin_token: Option<String>) -> Result<Self> {
        let index_path = index_path.into();
        let engine = match load_engine(&index_path) {
            Ok(engine) => Some(engine),
            Err(e @ Error::MissingIndex { .. }) => {
                tracing::warn!(error = %e, "starting without an index");
                None
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { index_path, engine: Arc::new(RwLock::new(engine)), admin_token })
    }

    fn current(&self) -> Option<Arc<QueryEngine>> {
        self.engine.read().clone()
    }
}

pub fn build_app(index_path: impl Into<PathBuf>) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());
    let app_state = AppState::load(index_path, admin_token)?;
    Ok(router(app_state))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/search", get(search_handler))
        .route("/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.current();
    Json(HealthResponse {
        ok: true,
        documents: engine.as_ref().map(|e| e.index().num_docs),
        built_at: engine.as_ref().map(|e| e.index().built_at.clone()),
    })
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let engine = state.current().ok_or_else(|| {
        let e = Error::MissingIndex { path: state.index_path.clone() };
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    let k = params.k.clamp(1, MAX_K);
    let results = engine.retrieve(&params.q, k);
    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, k, hits = results.len(), "search");
    Ok(Json(SearchResponse {
        query: params.q,
        took_s: elapsed.as_secs_f64(),
        total_hits: results.len(),
        results,
    }))
}

/// Load the snapshot from disk again and swap it in.
async fn reload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HealthResponse>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let path = state.index_path.clone();
    let engine = tokio::task::spawn_blocking(move || load_engine(&path))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| match e {
            Error::MissingIndex { .. } => (StatusCode::NOT_FOUND, e.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    let response = HealthResponse {
        ok: true,
        documents: Some(engine.index().num_docs),
        built_at: Some(engine.index().built_at.clone()),
    };
    *state.engine.write() = Some(engine);
    Ok(Json(response))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
