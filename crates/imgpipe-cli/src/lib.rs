//! Rendering helpers for the imgpipe CLI.

use std::path::Path;
use std::time::Duration;

use imgpipe_core::{CandidateFile, FileValidator, Resolution, VariantSet};
use imgpipe_pipeline::RunState;
use serde::Serialize;

/// Load `path` for upload. Type and size are checked against the file's
/// metadata before any of its bytes are read.
pub async fn load_candidate(
    path: &Path,
    content_type: Option<&str>,
    validator: &FileValidator,
) -> anyhow::Result<CandidateFile> {
    let described = CandidateFile::describe(path, content_type).await?;
    if let Err(e) = validator.validate(&described) {
        anyhow::bail!(e.client_message());
    }
    described.read_body(path).await
}

/// Wait for the progress printer. A printer that panicked is logged, not
/// propagated; returns whether it finished cleanly.
pub async fn join_progress(printer: tokio::task::JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Progress printer failed");
            false
        }
    }
}

/// Human-readable size with base-1024 units, e.g. "1.5 KB".
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// "~4 seconds"
pub fn format_estimate(delay: Duration) -> String {
    let secs = delay.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("~{} seconds", secs as u64)
    } else {
        format!("~{:.1} seconds", secs)
    }
}

/// One progress line for a state, or `None` when there is nothing to show.
pub fn progress_line(state: &RunState) -> Option<String> {
    if !state.is_in_flight() {
        return None;
    }
    Some(format!(
        "[{:>3}%] {}",
        state.progress_percent(),
        state.status_message()
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantLine {
    pub resolution: Resolution,
    pub label: &'static str,
    /// Bounding box the variant was fitted into, e.g. "1280x720".
    pub max_dimensions: String,
    pub url: String,
}

pub fn variant_lines(variants: &VariantSet) -> Vec<VariantLine> {
    variants
        .iter()
        .map(|(resolution, url)| {
            let (width, height) = resolution.max_dimensions();
            VariantLine {
                resolution,
                label: resolution.label(),
                max_dimensions: format!("{width}x{height}"),
                url: url.to_string(),
            }
        })
        .collect()
}

/// Summary of a completed upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub original_filename: String,
    pub size_bytes: u64,
    pub size: String,
    pub content_type: String,
    pub key: String,
    pub estimated_processing_time: String,
    pub variants: Vec<VariantLine>,
}

impl UploadReport {
    pub fn new(
        file: &CandidateFile,
        key: &str,
        variants: &VariantSet,
        estimated: Duration,
    ) -> Self {
        Self {
            original_filename: file.name.clone(),
            size_bytes: file.size,
            size: format_file_size(file.size),
            content_type: file.content_type.clone(),
            key: key.to_string(),
            estimated_processing_time: format_estimate(estimated),
            variants: variant_lines(variants),
        }
    }

    pub fn to_table(&self) -> String {
        let mut out = String::from("\n=== Upload Complete ===\n\n");
        out.push_str(&format!("Original:        {}\n", self.original_filename));
        out.push_str(&format!("Size:            {}\n", self.size));
        out.push_str(&format!("Key:             {}\n", self.key));
        out.push_str(&format!(
            "Processing time: {}\n",
            self.estimated_processing_time
        ));
        out.push_str("Compression:     Optimized for web\n");
        out.push_str(&variants_table(&self.variants));
        out
    }
}

pub fn variants_table(lines: &[VariantLine]) -> String {
    let mut out = String::from("\n--- Variants ---\n");
    if lines.is_empty() {
        out.push_str("(none available)\n");
    }
    for line in lines {
        out.push_str(&format!(
            "{:<18} {:<11} {}\n",
            line.label, line.max_dimensions, line.url
        ));
    }
    out
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays clean
/// for `--format json`.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
