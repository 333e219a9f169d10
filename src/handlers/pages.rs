// src/handlers/pages.rs
// DOCUMENTATION: Server-rendered HTML handlers
// PURPOSE: Gallery pages, upload form, and delete actions

use crate::config::{Config, DbPool};
use crate::db::ImageRepository;
use crate::errors::GalleryError;
use crate::models::NewImage;
use crate::services::ImageService;
use actix_multipart::form::{bytes::Bytes as MultipartBytes, text::Text, MultipartForm};
use actix_web::{http::header, web, HttpResponse, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Flash message carried across redirects on the query string
#[derive(Debug, Clone, serde::Deserialize)]
pub struct FlashParams {
    pub msg: Option<String>,
    pub cat: Option<String>,
}

pub struct FlashMessage {
    pub message: String,
    pub category: String,
}

impl FlashParams {
    fn into_flash(self) -> Option<FlashMessage> {
        self.msg.map(|message| FlashMessage {
            message,
            category: self.cat.unwrap_or_else(|| "success".to_string()),
        })
    }
}

/// One gallery tile, payload pre-encoded for inline rendering
pub struct GalleryImage {
    pub id: i64,
    pub filename: String,
    pub data: String,
    pub content_type: String,
    pub description: Option<String>,
    pub upload_date: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct GalleryTemplate {
    pub images: Vec<GalleryImage>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_images: i64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: i64,
    pub next_page: i64,
    pub flash: Option<FlashMessage>,
}

#[derive(Template)]
#[template(path = "upload.html")]
pub struct UploadTemplate {
    pub allowed_extensions: String,
    pub max_upload_mb: usize,
    pub flash: Option<FlashMessage>,
}

/// Multipart upload form shared by the HTML and API upload endpoints
#[derive(MultipartForm)]
pub struct UploadForm {
    pub file: MultipartBytes,
    pub description: Option<Text<String>>,
}

/// GET /
/// First gallery page
pub async fn index(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    query: web::Query<FlashParams>,
) -> Result<impl Responder, GalleryError> {
    render_gallery(pool.get_ref(), config.get_ref(), 1, query.into_inner()).await
}

/// GET /page/{n}
/// Paginated gallery
pub async fn page(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<u32>,
    query: web::Query<FlashParams>,
) -> Result<impl Responder, GalleryError> {
    let page = path.into_inner().max(1) as i64;
    render_gallery(pool.get_ref(), config.get_ref(), page, query.into_inner()).await
}

async fn render_gallery(
    pool: &DbPool,
    config: &Config,
    page: i64,
    flash: FlashParams,
) -> Result<HttpResponse, GalleryError> {
    let per_page = config.default_pagination as i64;
    let offset = (page - 1) * per_page;

    let total_images = ImageRepository::count(pool).await?;
    let total_pages = ImageService::total_pages(total_images, config.default_pagination);

    let records = ImageRepository::list_page(pool, per_page, offset).await?;

    let images = records
        .into_iter()
        .map(|record| GalleryImage {
            id: record.id,
            filename: record.filename,
            data: BASE64.encode(&record.image_data),
            content_type: record.content_type,
            description: record.description,
            upload_date: record.upload_date.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    let template = GalleryTemplate {
        images,
        current_page: page,
        total_pages,
        total_images,
        has_prev: page > 1,
        has_next: page < total_pages,
        prev_page: page - 1,
        next_page: page + 1,
        flash: flash.into_flash(),
    };

    Ok(template.to_response())
}

/// GET /upload
/// Upload form
pub async fn upload_form(
    config: web::Data<Config>,
    query: web::Query<FlashParams>,
) -> impl Responder {
    UploadTemplate {
        allowed_extensions: config.allowed_extensions.join(", "),
        max_upload_mb: config.max_upload_size / (1024 * 1024),
        flash: query.into_inner().into_flash(),
    }
    .to_response()
}

/// POST /upload
/// Validate and store an uploaded image, then redirect with a flash message
pub async fn upload_submit(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    form: MultipartForm<UploadForm>,
) -> Result<impl Responder, GalleryError> {
    let form = form.into_inner();
    let filename = form.file.file_name.clone();
    let data = form.file.data.to_vec();

    if let Err(e) = ImageService::validate_upload(
        filename.as_deref(),
        &data,
        &config.allowed_extensions,
    ) {
        log::warn!("Upload rejected: {}", e);
        return Ok(redirect_with_flash("/upload", &e.to_string(), "error"));
    }

    let content_type = form
        .file
        .content_type
        .as_ref()
        .map(|mime| mime.to_string())
        .or_else(|| ImageService::detect_content_type(&data).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let image = NewImage {
        // validate_upload guarantees the filename is present
        filename: filename.unwrap_or_default(),
        image_data: data,
        content_type,
        description: form.description.map(|d| d.into_inner()).filter(|d| !d.is_empty()),
    };

    match ImageService::store_image(pool.get_ref(), config.get_ref(), image).await {
        Ok(_) => Ok(redirect_with_flash("/", "Image uploaded successfully!", "success")),
        Err(e) => {
            log::error!("Upload failed: {}", e);
            Ok(redirect_with_flash(
                "/upload",
                &format!("Error uploading image: {}", e),
                "error",
            ))
        }
    }
}

/// POST /delete/{id}
/// Delete one image; a missing id is a no-op, not an error
pub async fn delete_image(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> Result<impl Responder, GalleryError> {
    ImageRepository::delete(pool.get_ref(), path.into_inner()).await?;
    Ok(redirect_with_flash("/", "Image deleted successfully!", "success"))
}

/// POST /delete_all
/// Delete every image
pub async fn delete_all(pool: web::Data<DbPool>) -> Result<impl Responder, GalleryError> {
    ImageRepository::delete_all(pool.get_ref()).await?;
    Ok(redirect_with_flash("/", "All images deleted successfully!", "success"))
}

/// 303 redirect carrying a flash message on the query string
fn redirect_with_flash(location: &str, message: &str, category: &str) -> HttpResponse {
    let query = serde_urlencoded::to_string([("msg", message), ("cat", category)])
        .unwrap_or_default();

    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, format!("{}?{}", location, query)))
        .finish()
}

/// Configuration for HTML page routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/page/{page}", web::get().to(page))
        .route("/upload", web::get().to(upload_form))
        .route("/upload", web::post().to(upload_submit))
        .route("/delete/{id}", web::post().to(delete_image))
        .route("/delete_all", web::post().to(delete_all));
}
