// src/config/db.rs
// DOCUMENTATION: Database connection pool initialization
// PURPOSE: Setup PostgreSQL pool with automatic SQLite fallback

use crate::config::{Config, DatabaseType};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

/// Active database backend with its connection pool
/// DOCUMENTATION: Every repository operation matches on this enum,
/// issuing dialect-specific SQL to whichever backend is live
#[derive(Debug, Clone)]
pub enum DbPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DbPool {
    /// Human-readable backend name for logs and status output
    pub fn backend_name(&self) -> &'static str {
        match self {
            DbPool::Postgres(_) => "PostgreSQL",
            DbPool::Sqlite(_) => "SQLite",
        }
    }
}

/// Initialize the database connection pool
/// DOCUMENTATION: Tries PostgreSQL first (unless DATABASE_TYPE=sqlite),
/// falls back to SQLite once if the connection fails. Called during
/// application startup in main.rs; the returned pool is used for all
/// database operations.
pub async fn init_db_pool(config: &Config) -> Result<DbPool, sqlx::Error> {
    if config.database_type == DatabaseType::Postgres {
        log::info!("Connecting to PostgreSQL: {}", config.database_url);

        match connect_postgres(config).await {
            Ok(pool) => {
                log::info!("Connected to PostgreSQL database");
                return Ok(DbPool::Postgres(pool));
            }
            Err(e) => {
                log::warn!("PostgreSQL connection failed: {}", e);
                log::warn!("Falling back to SQLite: {}", config.sqlite_database);
            }
        }
    }

    let pool = connect_sqlite(config).await?;
    log::info!("Connected to SQLite database: {}", config.sqlite_database);
    Ok(DbPool::Sqlite(pool))
}

async fn connect_postgres(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connection_timeout))
        // Connection idle timeout (5 minutes)
        .idle_timeout(Duration::from_secs(300))
        .connect(&config.database_url)
        .await?;

    // Verify connection works
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

async fn connect_sqlite(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.sqlite_database)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connection_timeout))
        .connect_with(options)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}
