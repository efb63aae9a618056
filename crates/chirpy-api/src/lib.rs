pub mod auth;
pub mod chirps;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod webhooks;

pub use error::GatewayError;
pub use gateway::{AuthGateway, Session};
pub use routes::router;
pub use state::{AppState, AppStateInner};
