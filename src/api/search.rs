use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::models::{HealthResponse, SearchRequest, SearchResponse};
use crate::state::AppState;

const MAX_QUERY_CHARS: usize = 500;

/// POST /api/search — full retrieval pipeline:
///   1. LLM query rewrite (silent fallback to the original query)
///   2. Hybrid gather: vector top-30 + keyword scoring, two-phase fetch
///   3. AI scoring of the ≤9 enriched finalists
///   4. Weighted fusion, sort, limit
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Query too long (max {MAX_QUERY_CHARS} characters)"),
        ));
    }

    state
        .service
        .search_restaurants(&query, &req.filters, req.limit)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Search pipeline failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Search failed: {e}"),
            )
        })
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
}

/// GET /api/search/suggestions?q=... — static autocomplete.
pub async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Json<Vec<String>> {
    Json(state.service.search_suggestions(&params.q))
}

/// GET /api/health — per-collaborator availability.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.service.check_health().await)
}
