use std::sync::atomic::Ordering;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, Response},
};

use crate::state::AppState;

/// Counts every request to the static file server.
pub async fn count_hits(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

/// GET /admin/metrics
pub async fn metrics_page(State(state): State<AppState>) -> Html<String> {
    let hits = state.hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>\n<body>\n    <h1>Welcome, Chirpy Admin</h1>\n    <p>Chirpy has been visited {} times!</p>\n</body>\n</html>\n",
        hits
    ))
}

/// POST /admin/reset
pub async fn reset(State(state): State<AppState>) -> StatusCode {
    state.hits.store(0, Ordering::Relaxed);
    StatusCode::OK
}

/// GET /api/healthz
pub async fn healthz() -> &'static str {
    "OK"
}
