use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use tracing::{info, warn};

use chirpy_types::api::{USER_UPGRADED_EVENT, WebhookRequest};

use crate::error::GatewayError;
use crate::state::{AppState, blocking};

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("ApiKey "))
        .map(str::trim)
}

/// POST /api/polka/webhooks — billing provider callbacks.
///
/// The key is checked before the body is parsed. Events other than
/// `user.upgraded` are acknowledged and ignored.
pub async fn polka_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, GatewayError> {
    match api_key(&headers) {
        Some(key) if !state.polka_key.is_empty() && key == state.polka_key => {}
        _ => {
            warn!("Rejected billing webhook with a missing or wrong API key");
            return Err(GatewayError::Unauthorized);
        }
    }

    let req: WebhookRequest = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::BadRequest(format!("Invalid webhook body: {}", e)))?;

    if req.event != USER_UPGRADED_EVENT {
        info!("Ignoring billing webhook event '{}'", req.event);
        return Ok(StatusCode::NO_CONTENT);
    }

    let user_id = req.data.user_id;
    blocking(&state, move |s| s.gateway.upgrade_user(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
