// src/models/image.rs
// DOCUMENTATION: Core data structures for image records
// PURPOSE: Defines all serialization/deserialization models for API and database

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents a complete image record from the database
/// DOCUMENTATION: This struct maps directly to the images table
/// in either backend. Used for internal operations and gallery pages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImageRecord {
    /// Unique identifier (auto-incrementing)
    pub id: i64,

    /// Original filename as supplied by the uploader
    pub filename: String,

    /// Raw image bytes (BYTEA / BLOB)
    pub image_data: Vec<u8>,

    /// Declared MIME type, e.g. "image/jpeg"
    pub content_type: String,

    /// Optional free-text description
    pub description: Option<String>,

    /// When the row was inserted (database default: current timestamp)
    pub upload_date: NaiveDateTime,
}

/// Image metadata without the binary payload
/// DOCUMENTATION: Returned by GET /api/images - payloads stay in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImageMeta {
    pub id: i64,
    pub filename: String,
    pub content_type: String,
    pub description: Option<String>,
    pub upload_date: NaiveDateTime,
}

/// A validated image ready for insertion
#[derive(Debug, Clone)]
pub struct NewImage {
    pub filename: String,
    pub image_data: Vec<u8>,
    pub content_type: String,
    pub description: Option<String>,
}

/// Response body for successful API uploads
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub image_id: i64,
}
