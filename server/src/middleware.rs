//! Auth + rate-limit gate (spec §4.11) guarding every non-public route.
//!
//! Grounded on the teacher's `server/src/auth.rs` (`axum::middleware::from_fn_with_state`,
//! bearer-token extraction, `WWW-Authenticate` header shape) generalized from
//! an OAuth-discovery stub into full API-key + JWT validation with
//! per-route permission checks and token-bucket rate limiting.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dsearch_core::auth::jwt;
use dsearch_core::error::CoreError;
use dsearch_core::ratelimit::RouteClass;
use dsearch_core::types::Permission;

use crate::error::ApiError;
use crate::state::AppContext;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

/// Identity attached to the request once authentication succeeds. Handlers
/// that need the caller's key id (none currently do) can pull this out of
/// request extensions.
#[derive(Clone)]
pub struct AuthContext {
    pub key_id: String,
    pub permissions: Vec<Permission>,
}

/// Extract and validate the bearer credential — either a `ds_`-prefixed raw
/// API-key secret (looked up in the `AuthStore`) or an exchanged JWT (spec
/// §4.11 step 1: "bearer token ... OR exchanged JWT").
async fn authenticate(ctx: &AppContext, headers: &HeaderMap) -> Result<AuthContext, CoreError> {
    let token = bearer_token(headers).ok_or(CoreError::Unauthenticated)?;
    if token.starts_with("ds_") {
        let record = ctx.engine.auth.validate(token)?;
        Ok(AuthContext { key_id: record.id, permissions: record.permissions })
    } else {
        let claims = jwt::verify(&ctx.engine.config.jwt_secret, token)?;
        Ok(AuthContext { key_id: claims.sub, permissions: claims.permissions })
    }
}

/// Authenticate, enforce `required` permission (spec §4.11 step 3), then
/// apply the route class's rate-limit bucket (spec §4.11 "Rate limiting"),
/// keyed by the caller's api-key id.
async fn gate(
    ctx: &AppContext,
    headers: &HeaderMap,
    required: Permission,
    class: RouteClass,
) -> Result<AuthContext, CoreError> {
    let auth = authenticate(ctx, headers).await?;
    if !auth.permissions.contains(&required) {
        return Err(CoreError::Forbidden(format!("missing required permission: {}", required.as_str())));
    }
    ctx.engine.rate_gate.check(&auth.key_id, class)?;
    Ok(auth)
}

async fn run_gate(
    ctx: AppContext,
    mut request: Request,
    next: Next,
    required: Permission,
    class: RouteClass,
) -> Result<Response, Response> {
    match gate(&ctx, request.headers(), required, class).await {
        Ok(auth) => {
            request.extensions_mut().insert(auth);
            Ok(next.run(request).await)
        }
        Err(err) => Err(ApiError::from(err).into_response()),
    }
}

/// `read` permission, global rate class (spec §6 "Stats").
pub async fn require_read(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    run_gate(ctx, request, next, Permission::Read, RouteClass::Global).await
}

/// `search` permission, search rate class (spec §6 "Search").
pub async fn require_search(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    run_gate(ctx, request, next, Permission::Search, RouteClass::Search).await
}

/// `index` permission, index rate class (spec §6 "Directories").
pub async fn require_index(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    run_gate(ctx, request, next, Permission::Index, RouteClass::Index).await
}

/// Key-lifecycle routes are gated by the process-wide admin secret (spec
/// §4.11 "Admin key"), not by an `AuthStore` record — there would otherwise
/// be no way to mint the very first API key. Presented the same way as an
/// API-key secret: `Authorization: Bearer <admin_key>`.
pub async fn require_admin_secret(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let presented = bearer_token(request.headers());
    let expected = ctx.engine.config.admin_key.as_str();
    if expected.is_empty() || presented != Some(expected) {
        return Err(ApiError::from(CoreError::Unauthenticated).into_response());
    }
    Ok(next.run(request).await)
}
