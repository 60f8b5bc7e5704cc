//! Database layer for the Inkpost auth service.
//!
//! Manages the SQLite connection pool and embedded migrations.

pub mod user;

use crate::error::{ApiError, ApiResult};
use sqlx::sqlite::SqlitePool;
use std::path::Path;

/// Database connection options.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool.
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> ApiResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to create data directory: {}", e)))?;
    }

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    sqlx::sqlite::SqliteJournalMode::Wal
                } else {
                    sqlx::sqlite::SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await
        .map_err(ApiError::Database)?;

    Ok(pool)
}

/// Run migrations embedded at compile time from ./migrations.
pub async fn run_migrations(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| ApiError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection.
pub async fn test_connection(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(ApiError::Database)?;

    Ok(())
}
