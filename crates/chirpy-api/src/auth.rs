use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use chirpy_types::api::{CredentialsRequest, LoginResponse, TokenResponse};
use chirpy_types::models::User;

use crate::error::GatewayError;
use crate::extract::ApiJson;
use crate::middleware::bearer_token;
use crate::state::{AppState, blocking};

fn validate(req: &CredentialsRequest) -> Result<(), GatewayError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(GatewayError::BadRequest("A valid email is required".into()));
    }
    if req.password.is_empty() {
        return Err(GatewayError::BadRequest("A password is required".into()));
    }
    Ok(())
}

/// POST /api/users
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    validate(&req)?;

    let user = blocking(&state, move |s| s.gateway.register(&req.email, &req.password)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let session = blocking(&state, move |s| s.gateway.login(&req.email, &req.password)).await?;

    Ok(Json(LoginResponse {
        user: session.user,
        token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

/// PUT /api/users
pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    validate(&req)?;

    let updated = blocking(&state, move |s| {
        s.gateway
            .update_credentials(user.id, &req.email, &req.password)
    })
    .await?;
    Ok(Json(updated))
}

/// POST /api/refresh — bearer must be a refresh token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let token = bearer_token(&headers)?;
    let access = blocking(&state, move |s| s.gateway.refresh(&token)).await?;
    Ok(Json(TokenResponse { token: access }))
}

/// POST /api/revoke — logout is revoking the refresh token.
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, GatewayError> {
    let token = bearer_token(&headers)?;
    blocking(&state, move |s| s.gateway.revoke(&token)).await?;
    Ok(StatusCode::NO_CONTENT)
}
