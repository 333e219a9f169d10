// src/handlers/api.rs
// DOCUMENTATION: JSON API handlers
// PURPOSE: Upload/list mirrors of the HTML routes plus populate job control

use crate::config::{Config, DbPool};
use crate::db::ImageRepository;
use crate::errors::GalleryError;
use crate::handlers::pages::UploadForm;
use crate::models::{NewImage, UploadResponse};
use crate::services::{ImageService, PopulateJob, PopulateSettings};
use actix_multipart::form::MultipartForm;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

/// Optional request body for POST /api/populate
#[derive(Debug, Deserialize)]
pub struct PopulateRequest {
    /// Number of images to insert; defaults to the retention cap
    pub target: Option<u32>,
}

/// POST /api/upload
/// Validate and store an uploaded image
pub async fn api_upload(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    form: MultipartForm<UploadForm>,
) -> Result<impl Responder, GalleryError> {
    let form = form.into_inner();
    let filename = form.file.file_name.clone();
    let data = form.file.data.to_vec();

    ImageService::validate_upload(filename.as_deref(), &data, &config.allowed_extensions)?;

    let content_type = form
        .file
        .content_type
        .as_ref()
        .map(|mime| mime.to_string())
        .or_else(|| ImageService::detect_content_type(&data).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let image = NewImage {
        filename: filename.unwrap_or_default(),
        image_data: data,
        content_type,
        description: form.description.map(|d| d.into_inner()).filter(|d| !d.is_empty()),
    };

    let image_id = ImageService::store_image(pool.get_ref(), config.get_ref(), image).await?;

    Ok(HttpResponse::Created().json(UploadResponse {
        message: "Image uploaded successfully".to_string(),
        image_id,
    }))
}

/// GET /api/images
/// All image metadata, newest first
pub async fn api_images(pool: web::Data<DbPool>) -> Result<impl Responder, GalleryError> {
    let images = ImageRepository::list_metadata(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(images))
}

/// POST /api/populate
/// Start the background populate job
pub async fn populate_start(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    job: web::Data<PopulateJob>,
    body: Option<web::Json<PopulateRequest>>,
) -> Result<impl Responder, GalleryError> {
    let target = body
        .and_then(|b| b.target)
        .unwrap_or(config.max_images)
        .min(config.max_images);

    let settings = PopulateSettings::from_config(config.get_ref());
    job.start(pool.get_ref().clone(), settings, target).await?;

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "message": "Populate job started",
        "target": target,
    })))
}

/// GET /api/populate/progress
/// Current progress record
pub async fn populate_progress(job: web::Data<PopulateJob>) -> impl Responder {
    HttpResponse::Ok().json(job.snapshot().await)
}

/// POST /api/populate/stop
/// Cooperative stop request; a no-op when the job is idle
pub async fn populate_stop(job: web::Data<PopulateJob>) -> impl Responder {
    let was_running = job.request_stop().await;

    HttpResponse::Ok().json(serde_json::json!({
        "message": if was_running { "Stop requested" } else { "No populate job is running" },
        "was_running": was_running,
    }))
}

/// Configuration for API routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/upload", web::post().to(api_upload))
            .route("/images", web::get().to(api_images))
            .route("/populate", web::post().to(populate_start))
            .route("/populate/progress", web::get().to(populate_progress))
            .route("/populate/stop", web::post().to(populate_stop)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseType;
    use crate::db::init_schema;
    use crate::handlers;
    use actix_web::{http::StatusCode, test, App};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::io::Cursor;

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

    fn test_config() -> Config {
        Config {
            server_address: "127.0.0.1".to_string(),
            server_port: 0,
            database_type: DatabaseType::Sqlite,
            database_url: String::new(),
            sqlite_database: ":memory:".to_string(),
            db_max_connections: 1,
            db_connection_timeout: 5,
            max_upload_size: 16 * 1024 * 1024,
            allowed_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
            ],
            default_pagination: 8,
            max_images: 100,
            dataset_csv_file: "/nonexistent.csv".to_string(),
            max_workers: 2,
            download_timeout: 1,
            log_level: "warn".to_string(),
        }
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::new(1, 1);
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn multipart_body(filename: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
        let boundary = "test-boundary-7MA4YWxkTrZu0gW";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        (
            format!("multipart/form-data; boundary={}", boundary),
            body,
        )
    }

    #[actix_web::test]
    async fn test_api_images_empty() {
        let pool = test_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(PopulateJob::new()))
                .configure(handlers::api_config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/images").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Vec<serde_json::Value> = test::read_body_json(resp).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn test_api_upload_and_list() {
        let pool = test_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(PopulateJob::new()))
                .configure(handlers::api_config),
        )
        .await;

        let (content_type, body) = multipart_body("tiny.png", "image/png", &tiny_png());
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let created: serde_json::Value = test::read_body_json(resp).await;
        assert!(created["image_id"].as_i64().unwrap() > 0);

        let req = test::TestRequest::get().uri("/api/images").to_request();
        let listed: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["filename"], "tiny.png");
    }

    #[actix_web::test]
    async fn test_api_upload_rejects_bad_extension() {
        let pool = test_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(PopulateJob::new()))
                .configure(handlers::api_config),
        )
        .await;

        let (content_type, body) = multipart_body("script.exe", "image/png", &tiny_png());
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_delete_missing_id_redirects() {
        let pool = test_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(test_config()))
                .configure(handlers::pages_config),
        )
        .await;

        let req = test::TestRequest::post().uri("/delete/424242").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }

    #[actix_web::test]
    async fn test_populate_progress_idle() {
        let pool = test_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(PopulateJob::new()))
                .configure(handlers::api_config),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/populate/progress")
            .to_request();
        let progress: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(progress["status"], "idle");

        let req = test::TestRequest::post()
            .uri("/api/populate/stop")
            .to_request();
        let stopped: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stopped["was_running"], false);
    }
}
