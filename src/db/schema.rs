// src/db/schema.rs
// DOCUMENTATION: Schema creation and lightweight migration
// PURPOSE: Create the images table and index in either SQL dialect

use crate::config::DbPool;
use crate::errors::GalleryError;

/// Initialize the database schema
/// DOCUMENTATION: Creates the images table and upload_date index if missing,
/// then ensures the nullable description column exists on tables created by
/// older deployments. Called once at startup and by the db_manager binary.
pub async fn init_schema(pool: &DbPool) -> Result<(), GalleryError> {
    match pool {
        DbPool::Postgres(pg) => {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS images (
                    id BIGSERIAL PRIMARY KEY,
                    filename VARCHAR(255) NOT NULL,
                    image_data BYTEA NOT NULL,
                    content_type VARCHAR(50) NOT NULL,
                    description TEXT,
                    upload_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            )
            .execute(pg)
            .await
            .map_err(|e| {
                log::error!("Failed to create images table: {}", e);
                GalleryError::DatabaseError(e.to_string())
            })?;

            sqlx::query(
                "CREATE INDEX IF NOT EXISTS idx_images_upload_date ON images (upload_date DESC)",
            )
            .execute(pg)
            .await
            .map_err(|e| GalleryError::DatabaseError(e.to_string()))?;

            ensure_description_column_postgres(pg).await?;
        }
        DbPool::Sqlite(sq) => {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS images (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    filename TEXT NOT NULL,
                    image_data BLOB NOT NULL,
                    content_type TEXT NOT NULL,
                    description TEXT,
                    upload_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            )
            .execute(sq)
            .await
            .map_err(|e| {
                log::error!("Failed to create images table: {}", e);
                GalleryError::DatabaseError(e.to_string())
            })?;

            sqlx::query(
                "CREATE INDEX IF NOT EXISTS idx_images_upload_date ON images (upload_date DESC)",
            )
            .execute(sq)
            .await
            .map_err(|e| GalleryError::DatabaseError(e.to_string()))?;

            // SQLite has no IF NOT EXISTS for columns; a duplicate-column
            // error means the migration already ran
            if let Err(e) = sqlx::query("ALTER TABLE images ADD COLUMN description TEXT")
                .execute(sq)
                .await
            {
                log::debug!("description column already present: {}", e);
            }
        }
    }

    log::info!("Database schema initialized ({})", pool.backend_name());
    Ok(())
}

/// Add the description column to PostgreSQL tables created before it existed
async fn ensure_description_column_postgres(pg: &sqlx::PgPool) -> Result<(), GalleryError> {
    let existing: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT column_name
        FROM information_schema.columns
        WHERE table_name = 'images' AND column_name = 'description'
        "#,
    )
    .fetch_optional(pg)
    .await
    .map_err(|e| GalleryError::DatabaseError(e.to_string()))?;

    if existing.is_none() {
        log::info!("Adding missing description column to images table");
        sqlx::query("ALTER TABLE images ADD COLUMN description TEXT")
            .execute(pg)
            .await
            .map_err(|e| GalleryError::DatabaseError(e.to_string()))?;
    }

    Ok(())
}
