// src/bin/cli_upload.rs
// Command-line upload tool: pushes one image file to a running gallery
// server through POST /api/upload.

use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::multipart;
use std::path::PathBuf;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

#[derive(Parser)]
#[command(name = "cli_upload", about = "Upload an image to the gallery server")]
struct Cli {
    /// Path to the image file
    file: PathBuf,

    /// Server base URL
    #[arg(default_value = "http://localhost:5001")]
    server: String,

    /// Optional description stored with the image
    #[arg(long)]
    description: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    if !cli.file.exists() {
        bail!("File '{}' not found", cli.file.display());
    }

    let extension = cli
        .file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        bail!(
            "'{}' is not a supported image format (supported: {})",
            cli.file.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        );
    }

    let filename = cli
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let data = std::fs::read(&cli.file)
        .with_context(|| format!("reading {}", cli.file.display()))?;

    println!("Uploading {} to {}...", filename, server);

    let mut form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(data).file_name(filename.clone()),
    );
    if let Some(description) = cli.description {
        form = form.text("description", description);
    }

    let response = reqwest::Client::new()
        .post(format!("{}/api/upload", server))
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("could not connect to server at {}", server))?;

    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();

    if status.is_success() {
        println!("{}Upload successful!{}", GREEN, RESET);
        println!("  Image ID: {}", body["image_id"]);
        println!("  Message:  {}", body["message"].as_str().unwrap_or(""));
        Ok(())
    } else {
        println!("{}Upload failed (HTTP {}){}", RED, status, RESET);
        if let Some(message) = body["error"]["message"].as_str() {
            println!("  Error: {}", message);
        }
        std::process::exit(1);
    }
}
