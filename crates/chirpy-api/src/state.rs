use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tracing::error;

use chirpy_db::Store;

use crate::error::GatewayError;
use crate::gateway::AuthGateway;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub gateway: AuthGateway,
    pub polka_key: String,
    /// Requests served from `/app`.
    pub hits: AtomicU64,
}

impl AppStateInner {
    pub fn new(gateway: AuthGateway, polka_key: String) -> Self {
        Self {
            gateway,
            polka_key,
            hits: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Store {
        self.gateway.store()
    }
}

/// Run store I/O or password hashing off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, GatewayError>
where
    F: FnOnce(&AppStateInner) -> Result<T, GatewayError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&*state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            GatewayError::Internal(e.to_string())
        })?
}
