use std::path::Path;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, chirps, metrics, webhooks};

/// Build the full HTTP surface. `file_root` is served under `/app`.
pub fn router(state: AppState, file_root: &Path) -> Router {
    let public_routes = Router::new()
        .route("/api/healthz", get(metrics::healthz))
        .route("/api/users", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/revoke", post(auth::revoke))
        .route("/api/chirps", get(chirps::list_chirps))
        .route("/api/chirps/{id}", get(chirps::get_chirp))
        .route("/api/polka/webhooks", post(webhooks::polka_webhook))
        .route("/admin/metrics", get(metrics::metrics_page))
        .route("/admin/reset", post(metrics::reset))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/users", put(auth::update_user))
        .route("/api/chirps", post(chirps::create_chirp))
        .route("/api/chirps/{id}", delete(chirps::delete_chirp))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let static_files = Router::new()
        .nest_service("/app", ServeDir::new(file_root))
        .layer(middleware::from_fn_with_state(state, metrics::count_hits));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(static_files)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
