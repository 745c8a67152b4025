//! PostgreSQL storage layer for the adaptive assessment engine.
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod error;
pub mod repository;

pub use error::StorageError;
pub use repository::PostgresRepository;

/// Creates a connection pool with `max_connections` pooled connections.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, StorageError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(StorageError::Connection)
}

/// Runs pending migrations against `pool`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(StorageError::Migration)
}

/// A cheap liveness check for readiness probes.
pub async fn check_connection(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(StorageError::Query)?;
    Ok(())
}
