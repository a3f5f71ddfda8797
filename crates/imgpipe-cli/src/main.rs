//! imgpipe CLI: upload an image and fetch its resized variants.
//!
//! Set IMGPIPE_API_URL (or API_URL). See `ClientConfig` for the other knobs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use imgpipe_api_client::ApiClient;
use imgpipe_cli::{
    format_estimate, format_file_size, init_tracing, join_progress, load_candidate,
    progress_line, variant_lines, variants_table, UploadReport,
};
use imgpipe_core::{
    CandidateFile, ClientConfig, DelayEstimator, ErrorMetadata, FileValidator, SizeTieredDelay,
};
use imgpipe_pipeline::{RunSnapshot, RunState, UploadOrchestrator};
use serde::Serialize;
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "imgpipe", about = "Upload images and fetch their resized variants")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and wait for its 1080p/720p/480p variants
    Upload {
        /// Path to the image
        file: PathBuf,
        /// Declared media type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Look up processed variants for an already uploaded key
    Variants {
        /// Canonicalized key returned by the upload grant
        key: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Validate a file locally without contacting the backend
    Check {
        /// Path to the image
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn print_progress(mut rx: watch::Receiver<RunSnapshot>) {
    let mut last = None;
    while rx.changed().await.is_ok() {
        let line = progress_line(&rx.borrow_and_update().state);
        if line.is_some() && line != last {
            if let Some(text) = &line {
                eprintln!("{}", text);
            }
            last = line;
        }
    }
}

async fn upload(
    config: &ClientConfig,
    path: PathBuf,
    content_type: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let validator = FileValidator::new(config.max_file_size_bytes);
    let file = load_candidate(&path, content_type.as_deref(), &validator).await?;
    let client = Arc::new(ApiClient::from_config(config)?);
    let orchestrator = UploadOrchestrator::from_client(client, config);

    if let Err(e) = orchestrator.select_file(file) {
        bail!(e.client_message());
    }

    let progress = tokio::spawn(print_progress(orchestrator.subscribe()));
    let result = orchestrator.start().await;
    let snapshot = orchestrator.snapshot();
    let report = match (&result, &snapshot.state) {
        (Ok(_), RunState::Completed { file, key, variants }) => Some(UploadReport::new(
            file,
            key,
            variants,
            orchestrator.estimated_processing_time(file.size),
        )),
        _ => None,
    };
    // Closing the channel ends the printer.
    drop(orchestrator);
    join_progress(progress).await;

    if let Err(e) = result {
        bail!(e.client_message());
    }
    let report = report.context("Run finished without a result")?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print!("{}", report.to_table()),
    }
    Ok(())
}

async fn show_variants(
    config: &ClientConfig,
    key: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let client = ApiClient::from_config(config)?;
    let variants = client.get_processed_images(key).await?;

    match format {
        OutputFormat::Json => print_json(&variants)?,
        OutputFormat::Table => print!("{}", variants_table(&variant_lines(&variants))),
    }
    Ok(())
}

async fn check(
    config: &ClientConfig,
    path: PathBuf,
    content_type: Option<String>,
) -> anyhow::Result<()> {
    let file = CandidateFile::describe(&path, content_type.as_deref()).await?;
    let validator = FileValidator::new(config.max_file_size_bytes);

    if let Err(e) = validator.validate(&file) {
        bail!(e.client_message());
    }

    println!(
        "OK: {} ({}, {}), estimated processing {}",
        file.name,
        format_file_size(file.size),
        file.content_type,
        format_estimate(SizeTieredDelay::default().initial_delay(file.size))
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ClientConfig::from_env()
        .context("Invalid configuration. Check IMGPIPE_API_URL and the IMGPIPE_* settings")?;

    match cli.command {
        Commands::Upload {
            file,
            content_type,
            format,
        } => upload(&config, file, content_type, format).await,
        Commands::Variants { key, format } => show_variants(&config, &key, format).await,
        Commands::Check { file, content_type } => check(&config, file, content_type).await,
    }
}
