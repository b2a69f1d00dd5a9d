//! API-key lifecycle + JWT exchange routes (spec §4.11, §6 "Auth").
//!
//! `create-key`/`list-keys`/`revoke-key` are gated by the process-wide admin
//! secret ([`crate::middleware::require_admin_secret`]); `validate-key` and
//! `login` are public (spec §4.11 "except ... key-validate, and login").

use axum::extract::{ConnectInfo, Path, State};
use axum::Json;
use dsearch_core::auth::jwt;
use dsearch_core::error::CoreError;
use dsearch_core::ratelimit::RouteClass;
use dsearch_core::types::{ApiKeyRecord, Permission};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::{ApiError, ApiResponse};
use crate::state::AppContext;

/// Public view of an API key — never includes `hashed_secret`.
#[derive(Serialize)]
pub struct KeyInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub permissions: Vec<Permission>,
    pub active: bool,
}

impl From<ApiKeyRecord> for KeyInfo {
    fn from(r: ApiKeyRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            created_at: r.created_at,
            expires_at: r.expires_at,
            permissions: r.permissions,
            active: r.active,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    pub description: Option<String>,
    pub expires_days: Option<i64>,
    pub permissions: Vec<Permission>,
}

#[derive(Serialize)]
pub struct CreateKeyResponse {
    pub api_key: String,
    pub key_info: KeyInfo,
}

/// `POST /api/v1/auth/create-key` — admin-only (spec §6 "Auth").
pub async fn create_key(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateKeyRequest>,
) -> Result<Json<ApiResponse<CreateKeyResponse>>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(CoreError::InvalidInput("name must not be empty".into()).into());
    }
    let expires_at = req
        .expires_days
        .map(|days| chrono::Utc::now() + chrono::Duration::days(days));

    let created = ctx.engine.auth.create_key(req.name, req.description, expires_at, req.permissions)?;
    Ok(ApiResponse::ok(CreateKeyResponse {
        api_key: created.plaintext,
        key_info: created.record.into(),
    }))
}

#[derive(Serialize)]
pub struct ListKeysResponse {
    pub keys: Vec<KeyInfo>,
}

/// `GET /api/v1/auth/list-keys` — admin-only.
pub async fn list_keys(
    State(ctx): State<AppContext>,
) -> Result<Json<ApiResponse<ListKeysResponse>>, ApiError> {
    let keys = ctx.engine.auth.list()?.into_iter().map(KeyInfo::from).collect();
    Ok(ApiResponse::ok(ListKeysResponse { keys }))
}

#[derive(Serialize)]
pub struct RevokeKeyResponse {
    pub ok: bool,
}

/// `DELETE /api/v1/auth/revoke-key/{key_id}` — admin-only.
pub async fn revoke_key(
    State(ctx): State<AppContext>,
    Path(key_id): Path<String>,
) -> Result<Json<ApiResponse<RevokeKeyResponse>>, ApiError> {
    ctx.engine.auth.revoke(&key_id)?;
    Ok(ApiResponse::ok(RevokeKeyResponse { ok: true }))
}

#[derive(Deserialize)]
pub struct ValidateKeyRequest {
    pub api_key: String,
}

#[derive(Serialize)]
pub struct ValidateKeyResponse {
    pub key_info: KeyInfo,
}

/// `POST /api/v1/auth/validate-key` — public (spec §4.11 exception list).
/// Still rate-limited by client IP so an unauthenticated caller can't probe
/// secrets without bound (spec §4.11 "keyed by (api_key_id or client_ip)").
pub async fn validate_key(
    State(ctx): State<AppContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ValidateKeyRequest>,
) -> Result<Json<ApiResponse<ValidateKeyResponse>>, ApiError> {
    ctx.engine.rate_gate.check(&addr.ip().to_string(), RouteClass::Global)?;
    let record = ctx.engine.auth.validate(&req.api_key)?;
    Ok(ApiResponse::ok(ValidateKeyResponse { key_info: record.into() }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub api_key: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// `POST /api/v1/auth/login` — exchanges a validated API key for a 30-minute
/// JWT (spec §4.11 "JWT exchange").
pub async fn login(
    State(ctx): State<AppContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    ctx.engine.rate_gate.check(&addr.ip().to_string(), RouteClass::Global)?;
    let record = ctx.engine.auth.validate(&req.api_key)?;
    let token = jwt::issue(&ctx.engine.config.jwt_secret, &record.id, record.permissions)?;
    Ok(ApiResponse::ok(LoginResponse {
        access_token: token,
        token_type: "bearer",
        expires_in: jwt::TOKEN_TTL_SECS,
    }))
}
