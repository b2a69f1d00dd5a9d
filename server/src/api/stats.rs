//! System stats route (spec §6 "Stats", permission `read`).

use axum::extract::State;
use axum::Json;
use dsearch_core::EngineStats;

use crate::error::ApiResponse;
use crate::state::AppContext;

/// `GET /api/v1/stats/system`.
pub async fn system(State(ctx): State<AppContext>) -> Json<ApiResponse<EngineStats>> {
    ApiResponse::ok(ctx.engine.stats())
}
