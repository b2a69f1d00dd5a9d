//! System routes — `/health` and `/api/info` (spec §6 "System"), excepted
//! from the auth gate (spec §4.11).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::ApiResponse;
use crate::state::AppContext;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

/// `GET /health` — liveness probe, grounded on the teacher's `api_health`.
pub async fn health() -> impl IntoResponse {
    Json(HealthBody { status: "healthy" })
}

#[derive(Serialize)]
struct InfoBody {
    name: &'static str,
    version: &'static str,
    docs: &'static str,
}

/// `GET /api/info` — name, version, docs path (spec §6 "System").
pub async fn info(State(_ctx): State<AppContext>) -> impl IntoResponse {
    ApiResponse::ok(InfoBody {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        docs: "/api/info",
    })
}
