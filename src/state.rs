use crate::{
    config::Config, middleware::TokenVerifier, services::PresenceTracker,
    websocket::ConnectionRegistry,
};
use deadpool_postgres::Pool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool,
    pub registry: ConnectionRegistry,
    pub presence: PresenceTracker,
    pub config: Arc<Config>,
    pub verifier: Arc<dyn TokenVerifier>,
}
