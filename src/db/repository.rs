// src/db/repository.rs
// DOCUMENTATION: Database access layer - all SQL queries
// PURPOSE: Abstract database operations from business logic

use crate::config::DbPool;
use crate::errors::GalleryError;
use crate::models::{ImageMeta, ImageRecord, NewImage};
use chrono::Utc;

/// ImageRepository: All database operations for image records
/// DOCUMENTATION: Every method matches on the active backend and issues
/// dialect-specific SQL ($n placeholders for PostgreSQL, ? for SQLite)
pub struct ImageRepository;

impl ImageRepository {
    /// Insert a new image record and return its id
    /// DOCUMENTATION: Used by the upload endpoints and the populate worker.
    /// The upload timestamp is bound explicitly so both backends store a
    /// value that round-trips through chrono.
    pub async fn insert(pool: &DbPool, image: &NewImage) -> Result<i64, GalleryError> {
        let now = Utc::now().naive_utc();

        let id: i64 = match pool {
            DbPool::Postgres(pg) => sqlx::query_scalar(
                r#"
                INSERT INTO images (filename, image_data, content_type, description, upload_date)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(&image.filename)
            .bind(&image.image_data)
            .bind(&image.content_type)
            .bind(&image.description)
            .bind(now)
            .fetch_one(pg)
            .await,
            DbPool::Sqlite(sq) => sqlx::query_scalar(
                r#"
                INSERT INTO images (filename, image_data, content_type, description, upload_date)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(&image.filename)
            .bind(&image.image_data)
            .bind(&image.content_type)
            .bind(&image.description)
            .bind(now)
            .fetch_one(sq)
            .await,
        }
        .map_err(|e| {
            log::error!("Failed to insert image {}: {}", image.filename, e);
            GalleryError::DatabaseError(e.to_string())
        })?;

        log::info!("Inserted image {} with id {}", image.filename, id);
        Ok(id)
    }

    /// Total number of stored images
    pub async fn count(pool: &DbPool) -> Result<i64, GalleryError> {
        let count: i64 = match pool {
            DbPool::Postgres(pg) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM images")
                    .fetch_one(pg)
                    .await
            }
            DbPool::Sqlite(sq) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM images")
                    .fetch_one(sq)
                    .await
            }
        }
        .map_err(|e| {
            log::error!("Count query error: {}", e);
            GalleryError::DatabaseError(e.to_string())
        })?;

        Ok(count)
    }

    /// Fetch one gallery page of full records, newest first
    /// DOCUMENTATION: Used by GET / and GET /page/{n}
    /// Ties on upload_date break on id so page boundaries are stable
    pub async fn list_page(
        pool: &DbPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImageRecord>, GalleryError> {
        let rows = match pool {
            DbPool::Postgres(pg) => sqlx::query_as::<_, ImageRecord>(
                r#"
                SELECT id, filename, image_data, content_type, description, upload_date
                FROM images
                ORDER BY upload_date DESC, id DESC
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(pg)
            .await,
            DbPool::Sqlite(sq) => sqlx::query_as::<_, ImageRecord>(
                r#"
                SELECT id, filename, image_data, content_type, description, upload_date
                FROM images
                ORDER BY upload_date DESC, id DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(sq)
            .await,
        }
        .map_err(|e| {
            log::error!("Page query error: {}", e);
            GalleryError::DatabaseError(e.to_string())
        })?;

        Ok(rows)
    }

    /// Fetch metadata for every image, newest first
    /// DOCUMENTATION: Used by GET /api/images - binary payloads are not loaded
    pub async fn list_metadata(pool: &DbPool) -> Result<Vec<ImageMeta>, GalleryError> {
        let rows = match pool {
            DbPool::Postgres(pg) => sqlx::query_as::<_, ImageMeta>(
                r#"
                SELECT id, filename, content_type, description, upload_date
                FROM images
                ORDER BY upload_date DESC, id DESC
                "#,
            )
            .fetch_all(pg)
            .await,
            DbPool::Sqlite(sq) => sqlx::query_as::<_, ImageMeta>(
                r#"
                SELECT id, filename, content_type, description, upload_date
                FROM images
                ORDER BY upload_date DESC, id DESC
                "#,
            )
            .fetch_all(sq)
            .await,
        }
        .map_err(|e| {
            log::error!("Metadata query error: {}", e);
            GalleryError::DatabaseError(e.to_string())
        })?;

        Ok(rows)
    }

    /// Delete one image by id
    /// DOCUMENTATION: Returns the number of rows removed. Deleting an id
    /// that does not exist is a no-op, not an error.
    pub async fn delete(pool: &DbPool, id: i64) -> Result<u64, GalleryError> {
        let rows = match pool {
            DbPool::Postgres(pg) => {
                sqlx::query("DELETE FROM images WHERE id = $1")
                    .bind(id)
                    .execute(pg)
                    .await
                    .map(|r| r.rows_affected())
            }
            DbPool::Sqlite(sq) => {
                sqlx::query("DELETE FROM images WHERE id = ?")
                    .bind(id)
                    .execute(sq)
                    .await
                    .map(|r| r.rows_affected())
            }
        }
        .map_err(|e| {
            log::error!("Delete failed for image {}: {}", id, e);
            GalleryError::DatabaseError(e.to_string())
        })?;

        if rows == 0 {
            log::warn!("Delete requested for missing image id {}", id);
        } else {
            log::info!("Deleted image {}", id);
        }

        Ok(rows)
    }

    /// Delete every image
    pub async fn delete_all(pool: &DbPool) -> Result<u64, GalleryError> {
        let rows = match pool {
            DbPool::Postgres(pg) => sqlx::query("DELETE FROM images")
                .execute(pg)
                .await
                .map(|r| r.rows_affected()),
            DbPool::Sqlite(sq) => sqlx::query("DELETE FROM images")
                .execute(sq)
                .await
                .map(|r| r.rows_affected()),
        }
        .map_err(|e| {
            log::error!("Delete-all failed: {}", e);
            GalleryError::DatabaseError(e.to_string())
        })?;

        log::info!("Deleted all images ({} rows)", rows);
        Ok(rows)
    }

    /// Enforce the retention cap after an insert
    /// DOCUMENTATION: Deletes every row outside the max_images most recent
    /// by upload_date descending. Returns the number of rows trimmed.
    pub async fn enforce_retention(pool: &DbPool, max_images: u32) -> Result<u64, GalleryError> {
        let keep = max_images as i64;

        let rows = match pool {
            DbPool::Postgres(pg) => sqlx::query(
                r#"
                DELETE FROM images
                WHERE id NOT IN (
                    SELECT id FROM images
                    ORDER BY upload_date DESC, id DESC
                    LIMIT $1
                )
                "#,
            )
            .bind(keep)
            .execute(pg)
            .await
            .map(|r| r.rows_affected()),
            DbPool::Sqlite(sq) => sqlx::query(
                r#"
                DELETE FROM images
                WHERE id NOT IN (
                    SELECT id FROM images
                    ORDER BY upload_date DESC, id DESC
                    LIMIT ?
                )
                "#,
            )
            .bind(keep)
            .execute(sq)
            .await
            .map(|r| r.rows_affected()),
        }
        .map_err(|e| {
            log::error!("Retention enforcement failed: {}", e);
            GalleryError::DatabaseError(e.to_string())
        })?;

        if rows > 0 {
            log::info!("Retention trimmed {} rows (cap {})", rows, max_images);
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    // Each in-memory SQLite connection is its own database, so the pool
    // is capped to a single connection
    async fn test_pool() -> DbPool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let pool = DbPool::Sqlite(pool);
        init_schema(&pool).await.expect("schema");
        pool
    }

    fn sample_image(name: &str) -> NewImage {
        NewImage {
            filename: name.to_string(),
            image_data: vec![0xFF, 0xD8, 0xFF, 0xE0],
            content_type: "image/jpeg".to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let pool = test_pool().await;

        assert_eq!(ImageRepository::count(&pool).await.unwrap(), 0);

        let id = ImageRepository::insert(&pool, &sample_image("a.jpg"))
            .await
            .unwrap();
        assert!(id > 0);
        assert_eq!(ImageRepository::count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_page_newest_first() {
        let pool = test_pool().await;

        for i in 0..10 {
            ImageRepository::insert(&pool, &sample_image(&format!("img_{:03}.jpg", i)))
                .await
                .unwrap();
        }

        let first = ImageRepository::list_page(&pool, 8, 0).await.unwrap();
        assert_eq!(first.len(), 8);
        assert_eq!(first[0].filename, "img_009.jpg");

        // Last page holds the remainder
        let last = ImageRepository::list_page(&pool, 8, 8).await.unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[1].filename, "img_000.jpg");
    }

    #[tokio::test]
    async fn test_retention_keeps_most_recent() {
        let pool = test_pool().await;

        for i in 0..105 {
            ImageRepository::insert(&pool, &sample_image(&format!("img_{:03}.jpg", i)))
                .await
                .unwrap();
            ImageRepository::enforce_retention(&pool, 100).await.unwrap();
        }

        assert_eq!(ImageRepository::count(&pool).await.unwrap(), 100);

        let metas = ImageRepository::list_metadata(&pool).await.unwrap();
        assert_eq!(metas.len(), 100);
        assert_eq!(metas[0].filename, "img_104.jpg");
        // The five oldest rows were trimmed
        assert_eq!(metas.last().unwrap().filename, "img_005.jpg");
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_noop() {
        let pool = test_pool().await;

        ImageRepository::insert(&pool, &sample_image("only.jpg"))
            .await
            .unwrap();

        let removed = ImageRepository::delete(&pool, 9999).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(ImageRepository::count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let pool = test_pool().await;

        for i in 0..3 {
            ImageRepository::insert(&pool, &sample_image(&format!("{}.png", i)))
                .await
                .unwrap();
        }

        let removed = ImageRepository::delete_all(&pool).await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(ImageRepository::count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_description_round_trip() {
        let pool = test_pool().await;

        let mut img = sample_image("captioned.jpg");
        img.description = Some("a mountain at dusk".to_string());
        ImageRepository::insert(&pool, &img).await.unwrap();

        let metas = ImageRepository::list_metadata(&pool).await.unwrap();
        assert_eq!(metas[0].description.as_deref(), Some("a mountain at dusk"));
    }
}
