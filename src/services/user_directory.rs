use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Username lookups against the user table owned by the auth service.
///
/// This is the only contact the core has with the user directory;
/// registration, login and listing live elsewhere.
pub struct UserDirectory;

impl UserDirectory {
    /// Resolve a username to its id, or `ReceiverNotFound`.
    pub async fn resolve_username(db: &Pool, username: &str) -> AppResult<Uuid> {
        let client = db.get().await?;
        let row = client
            .query_opt("SELECT id FROM users WHERE username = $1", &[&username])
            .await?
            .ok_or(AppError::ReceiverNotFound)?;
        Ok(row.get(0))
    }
}
