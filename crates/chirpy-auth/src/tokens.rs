use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Access tokens live for one hour.
pub const ACCESS_TOKEN_LIFETIME_SECS: i64 = 60 * 60;

/// Refresh tokens live for sixty hours.
pub const REFRESH_TOKEN_LIFETIME_SECS: i64 = 60 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not verify")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Role marker carried in the `iss` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "chirpy-access")]
    Access,
    #[serde(rename = "chirpy-refresh")]
    Refresh,
}

impl TokenKind {
    fn lifetime(self) -> Duration {
        match self {
            Self::Access => Duration::seconds(ACCESS_TOKEN_LIFETIME_SECS),
            Self::Refresh => Duration::seconds(REFRESH_TOKEN_LIFETIME_SECS),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: TokenKind,
    sub: String,
    iat: i64,
    exp: i64,
}

/// The parts of a verified token callers are allowed to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    pub subject_id: u64,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies HS256 session tokens with one process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue_access(&self, subject_id: u64) -> Result<String, TokenError> {
        self.issue_at(TokenKind::Access, subject_id, Utc::now())
    }

    pub fn issue_refresh(&self, subject_id: u64) -> Result<String, TokenError> {
        self.issue_at(TokenKind::Refresh, subject_id, Utc::now())
    }

    /// Mint a token as if it had been issued at `issued_at`. The lifetime
    /// still follows `kind`.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        subject_id: u64,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        debug!("Issuing {:?} token for user {}", kind, subject_id);

        let claims = Claims {
            iss: kind,
            sub: subject_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + kind.lifetime()).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and time claims. A token whose `exp` is at or before
    /// the current second is expired; there is no leeway.
    pub fn parse(&self, token: &str) -> Result<ParsedToken, TokenError> {
        self.decode(token, true)
    }

    /// Verify the signature only, accepting tokens that have already expired.
    /// Revocation uses this so a stale but genuine token can still be retired.
    pub fn verify_signature(&self, token: &str) -> Result<ParsedToken, TokenError> {
        self.decode(token, false)
    }

    pub fn is_access_token(&self, token: &str) -> bool {
        matches!(self.parse(token), Ok(parsed) if parsed.kind == TokenKind::Access)
    }

    fn decode(&self, token: &str, check_expiry: bool) -> Result<ParsedToken, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_expiry;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?
            .claims;

        if check_expiry && claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        let subject_id = claims.sub.parse().map_err(|_| TokenError::Malformed)?;
        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(TokenError::Malformed)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?;

        Ok(ParsedToken {
            subject_id,
            kind: claims.iss,
            issued_at,
            expires_at,
        })
    }
}
