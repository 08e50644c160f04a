use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{Config as PgConfig, NoTls};

use crate::error::AppError;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Build the connection pool and apply the schema.
pub async fn init_pool(database_url: &str) -> Result<Pool, AppError> {
    let pg_config: PgConfig = database_url
        .parse()
        .map_err(|e| AppError::Config(format!("DATABASE_URL parse: {e}")))?;

    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    let pool = Pool::builder(manager)
        .max_size(16)
        .build()
        .map_err(|e| AppError::StartServer(format!("build pool: {e}")))?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<(), AppError> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    tracing::info!("database schema applied");
    Ok(())
}
