use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Default inbound WebSocket frame cap. Covers inline file payloads.
const DEFAULT_MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Maximum inbound WebSocket frame size in bytes.
    pub max_frame_bytes: usize,
    /// Interval between server-initiated pings.
    pub heartbeat_interval: Duration,
    /// A connection that has not answered a ping within this window is dropped.
    pub client_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3001);
        let max_frame_bytes = env::var("WS_MAX_FRAME_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_FRAME_BYTES);
        let heartbeat_interval = env::var("WS_HEARTBEAT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));
        let client_timeout = env::var("WS_CLIENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            database_url,
            port,
            jwt_secret,
            max_frame_bytes,
            heartbeat_interval,
            client_timeout,
        })
    }
}
