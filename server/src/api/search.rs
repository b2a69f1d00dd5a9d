//! Search route (spec §6 "Search", permission `search`).

use axum::extract::State;
use axum::Json;
use dsearch_core::error::CoreError;
use dsearch_core::search::SearchParams;
use dsearch_core::types::{SearchResult, SearchType};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{ApiError, ApiResponse};
use crate::state::AppContext;

fn default_limit() -> usize {
    10
}

fn default_threshold() -> f32 {
    0.3
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub search_type: SearchType,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

#[derive(Serialize)]
pub struct SearchResponseBody {
    pub query: String,
    pub search_type: SearchType,
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    pub search_time_ms: u64,
}

/// `POST /api/v1/searcher/search` (spec §4.10, §6 "Search").
pub async fn search(
    State(ctx): State<AppContext>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<ApiResponse<SearchResponseBody>>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(CoreError::InvalidInput("query must not be empty".into()).into());
    }

    let started = Instant::now();
    let params = SearchParams {
        limit: req.limit.max(1),
        threshold: req.threshold,
        over_fetch: ctx.engine.config.semantic_over_fetch,
        alpha: ctx.engine.config.hybrid_default_alpha,
    };

    let results = ctx.engine.search(&req.query, req.search_type, &params)?;
    let total_results = results.len();
    Ok(ApiResponse::ok(SearchResponseBody {
        query: req.query,
        search_type: req.search_type,
        results,
        total_results,
        search_time_ms: started.elapsed().as_millis() as u64,
    }))
}
