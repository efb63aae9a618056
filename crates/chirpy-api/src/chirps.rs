use std::sync::LazyLock;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use regex::Regex;

use chirpy_types::api::{ChirpQuery, CreateChirpRequest};
use chirpy_types::models::User;

use crate::error::GatewayError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::{AppState, blocking};

/// Longest accepted chirp, in characters.
pub const MAX_CHIRP_CHARS: usize = 140;

static PROFANITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)kerfuffle|sharbert|fornax").expect("profanity pattern is valid")
});

/// Enforce the length limit and mask banned words. Runs before the store sees
/// the body.
pub fn clean_body(body: &str) -> Result<String, GatewayError> {
    if body.chars().count() > MAX_CHIRP_CHARS {
        return Err(GatewayError::BadRequest("Chirp is too long".into()));
    }
    Ok(PROFANITY.replace_all(body, "****").into_owned())
}

/// POST /api/chirps
pub async fn create_chirp(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(req): ApiJson<CreateChirpRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let body = clean_body(&req.body)?;
    let chirp = blocking(&state, move |s| Ok(s.store().create_chirp(&body, user.id)?)).await?;
    Ok((StatusCode::CREATED, Json(chirp)))
}

/// GET /api/chirps?author_id=N
pub async fn list_chirps(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ChirpQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let chirps = blocking(&state, move |s| {
        Ok(match query.author_id {
            Some(author_id) => s.store().list_chirps_by_author(author_id)?,
            None => s.store().list_chirps()?,
        })
    })
    .await?;
    Ok(Json(chirps))
}

/// GET /api/chirps/{id}
pub async fn get_chirp(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> Result<impl IntoResponse, GatewayError> {
    let chirp = blocking(&state, move |s| Ok(s.store().get_chirp(id)?)).await?;
    Ok(Json(chirp))
}

/// DELETE /api/chirps/{id} — only the author may delete.
pub async fn delete_chirp(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(id): ApiPath<u64>,
) -> Result<StatusCode, GatewayError> {
    blocking(&state, move |s| {
        let chirp = s.store().get_chirp(id)?;
        if chirp.author_id != user.id {
            return Err(GatewayError::Forbidden);
        }
        Ok(s.store().delete_chirp(id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
