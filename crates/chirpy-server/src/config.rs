use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Process-wide settings, read once at startup and never reloaded.
pub struct Config {
    pub jwt_secret: Vec<u8>,
    pub db_path: PathBuf,
    pub polka_key: String,
    pub file_root: PathBuf,
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("CHIRPY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CHIRPY_JWT_SECRET is unset or still a placeholder");
        }

        let polka_key = var("CHIRPY_POLKA_KEY").unwrap_or_default();
        if polka_key.is_empty() {
            bail!("CHIRPY_POLKA_KEY is unset");
        }

        let db_path = var("CHIRPY_DB_PATH").unwrap_or_else(|| "database.json".into());
        let file_root = var("CHIRPY_FILE_ROOT").unwrap_or_else(|| ".".into());
        let host = var("CHIRPY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("CHIRPY_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("CHIRPY_PORT is not a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            jwt_secret: jwt_secret.into_bytes(),
            db_path: db_path.into(),
            polka_key,
            file_root: file_root.into(),
            addr,
        })
    }
}
