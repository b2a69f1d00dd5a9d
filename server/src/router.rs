//! Route table assembly — grounded on the teacher's `server/src/main.rs`
//! route block (`Router::new().route(...).layer(...).with_state(ctx)`),
//! generalized to mount permission-gated route groups via
//! `route_layer`/`from_fn_with_state` instead of a single flat list.

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::middleware::{require_admin_secret, require_index, require_read, require_search};
use crate::state::AppContext;

/// Build the full `axum::Router`, mounting admin routes only when an admin
/// secret is configured (spec §4.11 "Missing admin key disables those
/// endpoints").
pub fn build(ctx: AppContext) -> Router {
    let public = Router::new()
        .route("/health", get(api::system::health))
        .route("/api/info", get(api::system::info))
        .route("/api/v1/auth/validate-key", post(api::auth::validate_key))
        .route("/api/v1/auth/login", post(api::auth::login));

    let directories = Router::new()
        .route("/api/v1/directories/add", post(api::directories::add))
        .route("/api/v1/directories/list", get(api::directories::list))
        .route("/api/v1/directories/status/{*path}", get(api::directories::status))
        .route("/api/v1/directories/refresh/{*path}", post(api::directories::refresh))
        .route("/api/v1/directories/remove/{*path}", delete(api::directories::remove))
        .route_layer(axum::middleware::from_fn_with_state(ctx.clone(), require_index));

    let search = Router::new()
        .route("/api/v1/searcher/search", post(api::search::search))
        .route_layer(axum::middleware::from_fn_with_state(ctx.clone(), require_search));

    let stats = Router::new()
        .route("/api/v1/stats/system", get(api::stats::system))
        .route_layer(axum::middleware::from_fn_with_state(ctx.clone(), require_read));

    let mut app = public.merge(directories).merge(search).merge(stats);

    if ctx.engine.config.admin_enabled() {
        let admin = Router::new()
            .route("/api/v1/auth/create-key", post(api::auth::create_key))
            .route("/api/v1/auth/list-keys", get(api::auth::list_keys))
            .route("/api/v1/auth/revoke-key/{key_id}", delete(api::auth::revoke_key))
            .route_layer(axum::middleware::from_fn_with_state(ctx.clone(), require_admin_secret));
        app = app.merge(admin);
    } else {
        tracing::warn!("admin_key not configured — key-lifecycle routes are disabled");
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
