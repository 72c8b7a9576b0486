//! Postgres pool bootstrap and schema migrations

use std::time::Duration;

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;

use crate::config::Config;

/// Embedded schema, applied at startup
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(#[source] sqlx::Error),

    #[error("Failed to run migrations: {0}")]
    MigrationError(#[from] MigrateError),
}

/// Open the connection pool
///
/// Every connection gets a `lock_timeout`, so a payment waiting on a challan
/// row held by a stuck settlement fails instead of queueing forever.
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!(
        url = %config.database_url_masked(),
        max_connections = config.db_max_connections,
        "Connecting to database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'challan-portal'").await?;
                conn.execute("SET lock_timeout = '10s'").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .map_err(DbError::ConnectionError)?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    MIGRATOR.run(pool).await?;
    tracing::info!(
        migrations = MIGRATOR.iter().count(),
        "Database schema is up to date"
    );
    Ok(())
}
