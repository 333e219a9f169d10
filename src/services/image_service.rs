// src/services/image_service.rs
// DOCUMENTATION: Business logic for image uploads
// PURPOSE: Validation and storage orchestration between handlers and repository

use crate::config::{Config, DbPool};
use crate::db::ImageRepository;
use crate::errors::GalleryError;
use crate::models::NewImage;

pub struct ImageService;

impl ImageService {
    /// Validate an uploaded file before it touches the database
    /// DOCUMENTATION: Checks the filename, its extension against the
    /// configured allow-list, and that the payload actually decodes as an
    /// image. Returns the rejection reason as a ValidationError.
    pub fn validate_upload(
        filename: Option<&str>,
        data: &[u8],
        allowed_extensions: &[String],
    ) -> Result<(), GalleryError> {
        let filename = match filename {
            Some(name) if !name.is_empty() => name,
            _ => return Err(GalleryError::ValidationError("No file selected".to_string())),
        };

        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if !allowed_extensions.iter().any(|e| *e == extension) {
            return Err(GalleryError::ValidationError(format!(
                "Invalid file type. Allowed extensions: {}",
                allowed_extensions.join(", ")
            )));
        }

        if data.is_empty() {
            return Err(GalleryError::ValidationError(
                "Uploaded file is empty".to_string(),
            ));
        }

        image::load_from_memory(data).map_err(|e| {
            GalleryError::ValidationError(format!("Invalid image file: {}", e))
        })?;

        Ok(())
    }

    /// Detect the MIME type of an image payload from its magic bytes
    pub fn detect_content_type(data: &[u8]) -> Option<&'static str> {
        image::guess_format(data).ok().map(|f| f.to_mime_type())
    }

    /// Insert a validated image and enforce the retention cap
    /// DOCUMENTATION: Single entry point used by both upload endpoints and
    /// the populate worker, so the retention invariant holds after every
    /// successful insert
    pub async fn store_image(
        pool: &DbPool,
        config: &Config,
        image: NewImage,
    ) -> Result<i64, GalleryError> {
        let id = ImageRepository::insert(pool, &image).await?;
        ImageRepository::enforce_retention(pool, config.max_images).await?;
        Ok(id)
    }

    /// Number of gallery pages for a given row count
    pub fn total_pages(total_images: i64, per_page: u32) -> i64 {
        let per_page = per_page.max(1) as i64;
        (total_images + per_page - 1) / per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn allowed() -> Vec<String> {
        vec![
            "jpg".to_string(),
            "jpeg".to_string(),
            "png".to_string(),
            "gif".to_string(),
        ]
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::new(1, 1);
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        buf
    }

    #[test]
    fn test_valid_png_accepted() {
        let data = tiny_png();
        assert!(ImageService::validate_upload(Some("photo.png"), &data, &allowed()).is_ok());
    }

    #[test]
    fn test_disallowed_extension_rejected() {
        let data = tiny_png();
        let err = ImageService::validate_upload(Some("notes.txt"), &data, &allowed()).unwrap_err();
        assert!(matches!(err, GalleryError::ValidationError(_)));
    }

    #[test]
    fn test_missing_filename_rejected() {
        let data = tiny_png();
        assert!(ImageService::validate_upload(None, &data, &allowed()).is_err());
        assert!(ImageService::validate_upload(Some(""), &data, &allowed()).is_err());
    }

    #[test]
    fn test_garbage_payload_rejected() {
        let err = ImageService::validate_upload(Some("x.png"), b"not an image", &allowed())
            .unwrap_err();
        assert!(matches!(err, GalleryError::ValidationError(_)));
    }

    #[test]
    fn test_detect_content_type() {
        let data = tiny_png();
        assert_eq!(ImageService::detect_content_type(&data), Some("image/png"));
        assert_eq!(ImageService::detect_content_type(b"garbage"), None);
    }

    #[test]
    fn test_total_pages_ceiling() {
        assert_eq!(ImageService::total_pages(0, 8), 0);
        assert_eq!(ImageService::total_pages(8, 8), 1);
        assert_eq!(ImageService::total_pages(9, 8), 2);
        assert_eq!(ImageService::total_pages(100, 8), 13);
    }
}
