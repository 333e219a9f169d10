// src/bin/populate.rs
// Remote driver for the gallery populate job: starts the job on a running
// server, polls its progress, and prints a summary when it finishes.

use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

// --- ANSI terminal colors ---
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

#[derive(Parser)]
#[command(name = "populate", about = "Fill the gallery with dataset images")]
struct Cli {
    /// Server base URL
    #[arg(long, default_value = "http://localhost:5001")]
    server: String,

    /// Number of images to insert (server caps this at MAX_IMAGES)
    #[arg(long, default_value_t = 100)]
    target: u32,

    /// Seconds between progress polls
    #[arg(long, default_value_t = 2)]
    poll_interval: u64,

    /// Ask the server to stop the current job and exit
    #[arg(long)]
    stop: bool,
}

#[derive(Debug, Deserialize)]
struct Progress {
    status: String,
    target: u32,
    attempted: u32,
    downloaded: u32,
    inserted: u32,
    failed: u32,
    #[serde(default)]
    errors: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")?;

    println!("{}Checking service status...{}", CYAN, RESET);
    let healthy = client
        .get(format!("{}/health", server))
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false);

    if !healthy {
        println!("{}Service unavailable at {}{}", RED, server, RESET);
        println!("{}Make sure the gallery server is running (cargo run){}", YELLOW, RESET);
        std::process::exit(1);
    }
    println!("{}Service available{}\n", GREEN, RESET);

    if cli.stop {
        let stopped: serde_json::Value = client
            .post(format!("{}/api/populate/stop", server))
            .send()
            .await
            .context("requesting stop")?
            .json()
            .await
            .context("parsing stop response")?;

        if stopped["was_running"].as_bool().unwrap_or(false) {
            println!("{}Stop requested{}", YELLOW, RESET);
        } else {
            println!("No populate job is running");
        }
        return Ok(());
    }

    println!("{}Starting populate job (target: {})...{}", BOLD, cli.target, RESET);
    let response = client
        .post(format!("{}/api/populate", server))
        .json(&serde_json::json!({ "target": cli.target }))
        .send()
        .await
        .context("starting populate job")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("Server refused to start the job: HTTP {} - {}", status, body);
    }

    loop {
        tokio::time::sleep(Duration::from_secs(cli.poll_interval)).await;

        let progress: Progress = client
            .get(format!("{}/api/populate/progress", server))
            .send()
            .await
            .context("polling progress")?
            .json()
            .await
            .context("parsing progress response")?;

        println!(
            "{}[{}]{} inserted {}/{} (attempted {}, downloaded {}, failed {})",
            CYAN,
            progress.status,
            RESET,
            progress.inserted,
            progress.target,
            progress.attempted,
            progress.downloaded,
            progress.failed
        );

        match progress.status.as_str() {
            "completed" => {
                println!(
                    "\n{}Done! {} images inserted into the gallery.{}",
                    GREEN, progress.inserted, RESET
                );
                print_errors(&progress);
                break;
            }
            "stopped" => {
                println!(
                    "\n{}Job stopped after {} inserts.{}",
                    YELLOW, progress.inserted, RESET
                );
                print_errors(&progress);
                break;
            }
            "failed" => {
                println!("\n{}Job failed.{}", RED, RESET);
                print_errors(&progress);
                std::process::exit(1);
            }
            _ => {}
        }
    }

    Ok(())
}

fn print_errors(progress: &Progress) {
    if !progress.errors.is_empty() {
        println!("{}Reported errors:{}", YELLOW, RESET);
        for error in &progress.errors {
            println!("  - {}", error);
        }
    }
}
