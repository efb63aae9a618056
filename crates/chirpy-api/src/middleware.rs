use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use crate::error::GatewayError;
use crate::state::{AppState, blocking};

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, GatewayError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(GatewayError::Unauthorized)
}

/// Authenticate the access token and expose the caller as an `Extension<User>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let token = bearer_token(req.headers())?;
    let user = blocking(&state, move |s| s.gateway.authenticate(&token)).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
