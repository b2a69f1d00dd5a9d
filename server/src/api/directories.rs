//! Directory lifecycle routes (spec §6 "Directories", permission `index`).
//!
//! Every handler here returns promptly — `refresh` hands back a task id
//! immediately rather than blocking until the ingest task completes (spec
//! §5 "MUST NOT block until completion").

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResponse};
use crate::state::AppContext;

#[derive(Deserialize)]
pub struct AddDirectoryQuery {
    pub path: String,
}

/// `POST /api/v1/directories/add?path=...` (spec §4.8 "add").
pub async fn add(
    State(ctx): State<AppContext>,
    Query(q): Query<AddDirectoryQuery>,
) -> Result<Json<ApiResponse<dsearch_core::types::DirectoryEntry>>, ApiError> {
    let entry = ctx.engine.add_directory(&q.path)?;
    Ok(ApiResponse::ok(entry))
}

#[derive(Serialize)]
pub struct ListDirectoriesResponse {
    pub directories: Vec<dsearch_core::types::DirectoryEntry>,
}

/// `GET /api/v1/directories/list`.
pub async fn list(
    State(ctx): State<AppContext>,
) -> Result<Json<ApiResponse<ListDirectoriesResponse>>, ApiError> {
    let directories = ctx.engine.list_directories()?;
    Ok(ApiResponse::ok(ListDirectoriesResponse { directories }))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub path: String,
    pub status: dsearch_core::types::DirectoryStatus,
    pub progress: f32,
    pub total_files: usize,
    pub indexed_files: usize,
    pub task_id: Option<String>,
    pub message: Option<String>,
}

/// `GET /api/v1/directories/status/{path}` (spec §6 "Directories").
pub async fn status(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let entry = ctx.engine.directory_status(&path)?;
    Ok(ApiResponse::ok(StatusResponse {
        path: entry.path,
        status: entry.status,
        progress: entry.progress,
        total_files: entry.total_files,
        indexed_files: entry.indexed_files,
        task_id: entry.last_task_id,
        message: entry.last_error,
    }))
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub task_id: String,
}

/// `POST /api/v1/directories/refresh/{path}` — starts (or joins) the ingest
/// task and returns its id without waiting (spec §4.9 "Ordering").
pub async fn refresh(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let task_id = ctx.engine.refresh_directory(&path)?;
    Ok(ApiResponse::ok(RefreshResponse { task_id }))
}

#[derive(Serialize)]
pub struct RemoveResponse {
    pub ok: bool,
}

/// `DELETE /api/v1/directories/remove/{path}` (spec §4.8 "remove").
pub async fn remove(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
) -> Result<Json<ApiResponse<RemoveResponse>>, ApiError> {
    ctx.engine.remove_directory(&path)?;
    Ok(ApiResponse::ok(RemoveResponse { ok: true }))
}
