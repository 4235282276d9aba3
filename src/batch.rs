//! Batch input and summary for URL extraction runs
//!
//! Supports:
//! - Plain text files with one URL per line (`#` comments and blank lines skipped)
//! - JSON files with an array of URL strings or objects with a "url" field
//! - A run summary with per-field hit counts, exportable as JSON

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::record::ExtractionResult;

/// Input format for URL list files
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    /// One URL per line
    Lines,
    /// JSON array
    Json,
}

impl InputFormat {
    /// Detect format from file extension; anything that is not `.json` is line-based
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref() {
            Some("json") => Self::Json,
            _ => Self::Lines,
        }
    }
}

/// Read the URL list from `path`. A missing or unreadable file is an error.
pub fn read_url_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    match InputFormat::from_path(path) {
        InputFormat::Lines => Ok(parse_url_lines(&content)),
        InputFormat::Json => parse_json_urls(&content),
    }
}

/// Parse one URL per line.
///
/// URLs are passed through as written (trimmed); malformed values fail later,
/// at render time, and still produce a record.
pub fn parse_url_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Parse URLs from JSON content
///
/// Supports:
/// 1. Array of URL strings: ["https://a.cn", "https://b.cn"]
/// 2. Array of objects with "url" field: [{"url": "https://a.cn"}]
pub fn parse_json_urls(content: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(content)
        .context("Failed to parse JSON content")?;

    let serde_json::Value::Array(items) = value else {
        bail!("JSON input must be an array of URLs");
    };

    let urls = items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::String(url) => Some(url.as_str()),
            serde_json::Value::Object(obj) => obj.get("url").and_then(|v| v.as_str()),
            _ => None,
        })
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();

    Ok(urls)
}

/// Summary of an extraction run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Records forwarded to the sink
    pub total_urls: usize,
    /// Records with a non-empty ICP field
    pub with_icp: usize,
    /// Records with a non-empty tech-support field
    pub with_tech_support: usize,
    /// Records with a non-empty copyright field
    pub with_copyright: usize,
    /// Records where all three fields are empty
    pub empty_records: usize,
    /// Records the sink failed to write
    pub sink_failures: usize,
    /// Total run duration in seconds
    pub total_duration_secs: f64,
    /// Timestamp when the run started
    pub started_at: String,
    /// Timestamp when the run completed
    pub completed_at: String,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self {
            total_urls: 0,
            with_icp: 0,
            with_tech_support: 0,
            with_copyright: 0,
            empty_records: 0,
            sink_failures: 0,
            total_duration_secs: 0.0,
            started_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            completed_at: String::new(),
        }
    }

    /// Count one forwarded record.
    pub fn record(&mut self, result: &ExtractionResult) {
        self.total_urls += 1;
        if !result.icp.is_empty() {
            self.with_icp += 1;
        }
        if !result.tech_support.is_empty() {
            self.with_tech_support += 1;
        }
        if !result.copyright.is_empty() {
            self.with_copyright += 1;
        }
        if result.is_empty() {
            self.empty_records += 1;
        }
    }

    pub fn record_sink_failure(&mut self) {
        self.sink_failures += 1;
    }

    /// Stamp the end time and duration.
    pub fn finalize(&mut self, duration_secs: f64) {
        self.total_duration_secs = duration_secs;
        self.completed_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    }
}

impl Default for BatchSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Export batch summary to JSON file
pub fn export_batch_summary(summary: &BatchSummary, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .context("Failed to serialize batch summary")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write batch summary to: {}", output_path.display()))?;

    Ok(())
}
