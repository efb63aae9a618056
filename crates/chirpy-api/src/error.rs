use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use chirpy_auth::{HashError, TokenError};
use chirpy_db::StoreError;
use chirpy_types::api::ErrorBody;

/// Outcomes of the request-facing operations.
///
/// `Unauthorized` deliberately carries no detail: unknown email, wrong
/// password, bad signature, wrong token kind, expiry and revocation all end
/// up here. The specific reason is only ever logged.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("A user with that email already exists")]
    AlreadyExists,

    #[error("{0}")]
    BadRequest(String),

    #[error("storage failure: {0}")]
    Storage(StoreError),

    #[error(transparent)]
    Hashing(#[from] HashError),

    /// Minting a token failed. Parse failures never map here; they become
    /// `Unauthorized`.
    #[error(transparent)]
    Signing(TokenError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::AlreadyExists => Self::AlreadyExists,
            other => Self::Storage(other),
        }
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Hashing(_) | Self::Signing(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Something went wrong".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
