//! Storage-level errors and their mapping onto the engine's error taxonomy.
use iidp_core::IidpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    #[error("query error: {0}")]
    Query(#[source] sqlx::Error),

    #[error("stored profile/response JSON is malformed: {0}")]
    Corrupt(#[source] serde_json::Error),
}

/// Maps a raw `sqlx` failure onto the taxonomy the engine's retry policy
/// understands (§7): unique-violation and serialization-failure map to
/// `Conflict` (retryable), everything else that isn't a row-not-found maps
/// to `TransientIo` (also retryable) so `with_retry` can mask a blip.
pub fn map_sqlx_error(err: sqlx::Error) -> IidpError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return IidpError::Conflict(db_err.message().to_string());
        }
        if let Some(code) = db_err.code() {
            // 40001 = serialization_failure, 40P01 = deadlock_detected
            if code == "40001" || code == "40P01" {
                return IidpError::Conflict(db_err.message().to_string());
            }
        }
    }
    IidpError::TransientIo(err.to_string())
}
