//! Chirpy credential primitives.
//!
//! Passwords are hashed with Argon2id. Sessions use HS256 JWTs in two kinds,
//! short-lived access tokens and long-lived refresh tokens, told apart by the
//! `iss` claim. Nothing here touches storage; revocation is the store's job.

pub mod password;
pub mod tokens;

pub use password::HashError;
pub use tokens::{ParsedToken, TokenError, TokenKind, TokenService};
