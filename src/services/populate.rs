// src/services/populate.rs
// DOCUMENTATION: Background dataset-populate job
// PURPOSE: Download sample images from a CSV of URLs and insert them

use crate::config::{Config, DbPool};
use crate::errors::GalleryError;
use crate::models::NewImage;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum error messages retained in the progress record
const MAX_ERRORS: usize = 20;

/// Payloads smaller than this are treated as failed downloads
/// (error pages and placeholder responses, not real images)
const MIN_PAYLOAD_BYTES: usize = 1000;

/// Lifecycle of the populate job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Stopping,
    Completed,
    Stopped,
    Failed,
}

/// Shared progress record for the populate job
/// DOCUMENTATION: Single mutable record updated by the worker task and
/// served verbatim by GET /api/populate/progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulateProgress {
    /// Current job state
    pub status: JobStatus,
    /// Number of images the job should insert
    pub target: u32,
    /// Downloads attempted so far
    pub attempted: u32,
    /// Downloads that returned a usable payload
    pub downloaded: u32,
    /// Images inserted into the database
    pub inserted: u32,
    /// Downloads or inserts that failed
    pub failed: u32,
    /// URL most recently handed to a download task
    pub current_url: Option<String>,
    /// Bounded list of error messages
    pub errors: Vec<String>,
    /// Timestamp when the job started
    pub started_at: Option<String>,
    /// Timestamp when the job reached a terminal state
    pub completed_at: Option<String>,
}

impl Default for PopulateProgress {
    fn default() -> Self {
        Self {
            status: JobStatus::Idle,
            target: 0,
            attempted: 0,
            downloaded: 0,
            inserted: 0,
            failed: 0,
            current_url: None,
            errors: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }
}

impl PopulateProgress {
    fn started(target: u32) -> Self {
        Self {
            status: JobStatus::Running,
            target,
            started_at: Some(Utc::now().to_rfc3339()),
            ..Self::default()
        }
    }

    fn finish(&mut self, status: JobStatus) {
        self.status = status;
        self.current_url = None;
        self.completed_at = Some(Utc::now().to_rfc3339());
    }

    fn push_error(&mut self, message: String) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(message);
        }
    }
}

/// One row of the dataset CSV
#[derive(Debug, Clone)]
pub struct DatasetRow {
    pub url: String,
    pub caption: Option<String>,
}

/// Worker settings derived from application configuration
#[derive(Debug, Clone)]
pub struct PopulateSettings {
    pub csv_file: String,
    pub download_timeout: u64,
    pub max_workers: usize,
    pub max_images: u32,
}

impl PopulateSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            csv_file: config.dataset_csv_file.clone(),
            download_timeout: config.download_timeout,
            max_workers: config.max_workers.max(1),
            max_images: config.max_images,
        }
    }
}

/// Handle to the populate job
/// DOCUMENTATION: One job may run at a time. State lives behind a tokio
/// RwLock; the worker runs as a detached task and checks the stop flag
/// between download batches, never mid-download.
#[derive(Clone)]
pub struct PopulateJob {
    progress: Arc<RwLock<PopulateProgress>>,
}

impl PopulateJob {
    pub fn new() -> Self {
        Self {
            progress: Arc::new(RwLock::new(PopulateProgress::default())),
        }
    }

    /// Copy of the current progress record
    pub async fn snapshot(&self) -> PopulateProgress {
        self.progress.read().await.clone()
    }

    /// Request a cooperative stop
    /// DOCUMENTATION: Returns true when a running job was flagged; calling
    /// this while idle is a no-op
    pub async fn request_stop(&self) -> bool {
        let mut progress = self.progress.write().await;
        if progress.status == JobStatus::Running {
            progress.status = JobStatus::Stopping;
            log::info!("Populate stop requested");
            true
        } else {
            false
        }
    }

    /// Start the populate worker
    /// DOCUMENTATION: Loads the dataset CSV up front so configuration
    /// mistakes surface in the HTTP response instead of the progress record,
    /// then spawns the detached worker task. Rejects a second start while a
    /// job is running.
    pub async fn start(
        &self,
        pool: DbPool,
        settings: PopulateSettings,
        target: u32,
    ) -> Result<(), GalleryError> {
        let rows = load_dataset(&settings.csv_file)?;

        {
            let mut progress = self.progress.write().await;
            if matches!(progress.status, JobStatus::Running | JobStatus::Stopping) {
                return Err(GalleryError::JobAlreadyRunning);
            }
            *progress = PopulateProgress::started(target);
        }

        log::info!(
            "Starting populate job: target={}, dataset={} ({} urls), workers={}",
            target,
            settings.csv_file,
            rows.len(),
            settings.max_workers
        );

        let progress = self.progress.clone();
        tokio::spawn(async move {
            run_worker(progress, pool, settings, rows, target).await;
        });

        Ok(())
    }
}

impl Default for PopulateJob {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker loop: cycle over the dataset in batches until the target is met
/// or a stop is requested
async fn run_worker(
    progress: Arc<RwLock<PopulateProgress>>,
    pool: DbPool,
    settings: PopulateSettings,
    rows: Vec<DatasetRow>,
    target: u32,
) {
    let client = match Client::builder()
        .timeout(Duration::from_secs(settings.download_timeout))
        .user_agent(concat!("image-gallery/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            let mut guard = progress.write().await;
            guard.push_error(format!("Failed to build HTTP client: {}", e));
            guard.finish(JobStatus::Failed);
            return;
        }
    };

    let mut cursor = 0usize;
    let mut sequence = 0u32;

    loop {
        // Stop flag is only honored between batches; in-flight requests
        // are awaited, not cancelled
        let (stopping, inserted) = {
            let guard = progress.read().await;
            (guard.status == JobStatus::Stopping, guard.inserted)
        };

        if stopping {
            progress.write().await.finish(JobStatus::Stopped);
            log::info!("Populate job stopped after {} inserts", inserted);
            return;
        }

        if inserted >= target {
            progress.write().await.finish(JobStatus::Completed);
            log::info!("Populate job completed: {} images inserted", inserted);
            return;
        }

        let remaining = (target - inserted) as usize;
        let batch_size = settings.max_workers.min(remaining);

        let mut batch = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            batch.push(rows[cursor % rows.len()].clone());
            cursor += 1;
        }

        let tasks = batch.into_iter().map(|row| {
            sequence += 1;
            fetch_and_store(
                progress.clone(),
                client.clone(),
                pool.clone(),
                settings.clone(),
                row,
                sequence,
            )
        });
        futures::future::join_all(tasks.collect::<Vec<_>>()).await;
    }
}

/// Download one URL, validate the payload, and insert it
async fn fetch_and_store(
    progress: Arc<RwLock<PopulateProgress>>,
    client: Client,
    pool: DbPool,
    settings: PopulateSettings,
    row: DatasetRow,
    sequence: u32,
) {
    {
        let mut guard = progress.write().await;
        guard.attempted += 1;
        guard.current_url = Some(row.url.clone());
    }

    match download_image(&client, &row.url).await {
        Ok(data) => {
            progress.write().await.downloaded += 1;

            match build_record(&data, row.caption.clone(), sequence) {
                Ok(image) => {
                    let result = async {
                        let id = crate::db::ImageRepository::insert(&pool, &image).await?;
                        crate::db::ImageRepository::enforce_retention(&pool, settings.max_images)
                            .await?;
                        Ok::<i64, GalleryError>(id)
                    }
                    .await;

                    let mut guard = progress.write().await;
                    match result {
                        Ok(_) => guard.inserted += 1,
                        Err(e) => {
                            guard.failed += 1;
                            guard.push_error(format!("{}: {}", row.url, e));
                        }
                    }
                }
                Err(reason) => {
                    let mut guard = progress.write().await;
                    guard.failed += 1;
                    guard.push_error(format!("{}: {}", row.url, reason));
                }
            }
        }
        Err(reason) => {
            log::debug!("Download failed for {}: {}", row.url, reason);
            let mut guard = progress.write().await;
            guard.failed += 1;
            guard.push_error(format!("{}: {}", row.url, reason));
        }
    }
}

async fn download_image(client: &Client, url: &str) -> Result<Vec<u8>, String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("request failed: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| format!("body read failed: {}", e))?;

    if bytes.len() < MIN_PAYLOAD_BYTES {
        return Err(format!("payload too small ({} bytes)", bytes.len()));
    }

    Ok(bytes.to_vec())
}

/// Turn a downloaded payload into an insertable record
/// DOCUMENTATION: Dataset URLs carry no reliable filename or extension, so
/// both are derived from the detected image format; the CSV caption becomes
/// the description
fn build_record(data: &[u8], caption: Option<String>, sequence: u32) -> Result<NewImage, String> {
    let format = image::guess_format(data).map_err(|e| format!("unknown format: {}", e))?;

    image::load_from_memory(data).map_err(|e| format!("not a decodable image: {}", e))?;

    let extension = format.extensions_str().first().copied().unwrap_or("img");

    Ok(NewImage {
        filename: format!("dataset_{:04}.{}", sequence, extension),
        image_data: data.to_vec(),
        content_type: format.to_mime_type().to_string(),
        description: caption.filter(|c| !c.is_empty()),
    })
}

/// Load the dataset CSV from disk
pub fn load_dataset(path: &str) -> Result<Vec<DatasetRow>, GalleryError> {
    let file = File::open(path).map_err(|e| {
        GalleryError::InvalidInput(format!("Cannot open dataset CSV {}: {}", path, e))
    })?;

    let rows = parse_dataset(file)
        .map_err(|e| GalleryError::InvalidInput(format!("Malformed dataset CSV {}: {}", path, e)))?;

    if rows.is_empty() {
        return Err(GalleryError::InvalidInput(format!(
            "Dataset CSV {} contains no usable URLs",
            path
        )));
    }

    Ok(rows)
}

/// Parse dataset rows from any reader
/// DOCUMENTATION: Accepts LAION-style exports - a URL column (any casing)
/// and an optional TEXT/caption column. Rows without an http(s) URL are
/// skipped.
pub fn parse_dataset<R: Read>(reader: R) -> Result<Vec<DatasetRow>, csv::Error> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let url_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("url"))
        .unwrap_or(0);
    let caption_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("text") || h.eq_ignore_ascii_case("caption"));

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let url = match record.get(url_idx) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                url.to_string()
            }
            _ => continue,
        };
        let caption = caption_idx
            .and_then(|i| record.get(i))
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        rows.push(DatasetRow { url, caption });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::io::Cursor;

    #[test]
    fn test_parse_dataset_laion_headers() {
        let csv = "URL,TEXT\nhttps://example.com/a.jpg,a red barn\nhttps://example.com/b.png,\n";
        let rows = parse_dataset(Cursor::new(csv)).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].url, "https://example.com/a.jpg");
        assert_eq!(rows[0].caption.as_deref(), Some("a red barn"));
        assert!(rows[1].caption.is_none());
    }

    #[test]
    fn test_parse_dataset_skips_non_http_rows() {
        let csv = "url,caption\nftp://example.com/x.jpg,nope\n,empty\nhttps://ok.com/y.gif,fine\n";
        let rows = parse_dataset(Cursor::new(csv)).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url, "https://ok.com/y.gif");
    }

    #[tokio::test]
    async fn test_snapshot_starts_idle() {
        let job = PopulateJob::new();
        let progress = job.snapshot().await;

        assert_eq!(progress.status, JobStatus::Idle);
        assert_eq!(progress.inserted, 0);
        assert!(progress.started_at.is_none());
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let job = PopulateJob::new();
        assert!(!job.request_stop().await);
        assert_eq!(job.snapshot().await.status, JobStatus::Idle);
    }

    #[tokio::test]
    async fn test_start_with_missing_csv_fails_synchronously() {
        let pool = DbPool::Sqlite(
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap(),
        );
        init_schema(&pool).await.unwrap();

        let job = PopulateJob::new();
        let settings = PopulateSettings {
            csv_file: "/nonexistent/dataset.csv".to_string(),
            download_timeout: 1,
            max_workers: 2,
            max_images: 100,
        };

        let err = job.start(pool, settings, 5).await.unwrap_err();
        assert!(matches!(err, GalleryError::InvalidInput(_)));
        assert_eq!(job.snapshot().await.status, JobStatus::Idle);
    }

    #[test]
    fn test_build_record_from_png() {
        let img = image::RgbaImage::new(2, 2);
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let record = build_record(&buf, Some("caption".to_string()), 7).unwrap();
        assert_eq!(record.content_type, "image/png");
        assert_eq!(record.filename, "dataset_0007.png");
        assert_eq!(record.description.as_deref(), Some("caption"));
    }

    #[test]
    fn test_build_record_rejects_garbage() {
        assert!(build_record(b"definitely not an image", None, 1).is_err());
    }

    #[test]
    fn test_progress_error_list_is_bounded() {
        let mut progress = PopulateProgress::started(10);
        for i in 0..50 {
            progress.push_error(format!("error {}", i));
        }
        assert_eq!(progress.errors.len(), MAX_ERRORS);
    }
}
