//! shoebox: one-shot batch organizer for a personal photo/video collection.
//!
//! Scans an input directory, groups files by capture date, mirrors them into
//! a local output directory and/or uploads them (plus thumbnails) to an S3
//! bucket, and keeps the bucket's static gallery pages up to date.

use clap::Parser;
use shoebox_gallery::Pages;
use shoebox_media::Classifier;
use shoebox_pipeline::{Orchestrator, RunConfig};
use shoebox_storage::backend::{LocalBackend, S3Backend};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "shoebox", version, about)]
struct Args {
    /// Input directory to scan for photos and videos
    #[arg(short, long)]
    input: PathBuf,

    /// Local output directory to mirror the dated layout into
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// S3 bucket to upload to
    #[arg(short, long)]
    bucket: Option<String>,

    /// AWS region (or provider-specific region string)
    #[arg(short, long, default_value = "us-east-1")]
    region: String,

    /// Custom endpoint URL for S3-compatible services
    #[arg(long)]
    endpoint: Option<String>,

    /// Re-upload files that already exist remotely
    #[arg(short = 'f', long)]
    overwrite: bool,

    /// Upload videos as-is instead of re-encoding them first
    #[arg(short = 'k', long)]
    keep_videos: bool,

    /// Maximum number of files processed concurrently
    #[arg(short = 't', long, default_value_t = 8)]
    threads: usize,

    /// Width of generated thumbnails in pixels
    #[arg(long, default_value_t = shoebox_media::THUMB_WIDTH)]
    thumb_width: u32,

    /// Only treat `.jpg` as photos, ignoring `.jpeg`
    #[arg(long)]
    jpg_only: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::from(1)
        },
    }
}

async fn run(args: Args) -> Result<bool, String> {
    if args.output.is_none() && args.bucket.is_none() {
        return Err("nothing to do: pass an output directory (-o), a bucket (-b), or both".to_string());
    }
    if !args.input.is_dir() {
        return Err(format!("input directory does not exist: {}", args.input.display()));
    }

    let config = RunConfig {
        overwrite: args.overwrite,
        keep_videos: args.keep_videos,
        concurrency: args.threads.max(1),
        thumb_width: args.thumb_width,
        classifier: Classifier { jpeg_variants: !args.jpg_only },
    };
    let mut orchestrator = Orchestrator::new(config);

    if let Some(output) = &args.output {
        let absolute = match output.is_absolute() {
            true => output.clone(),
            false => std::env::current_dir()
                .map_err(|e| format!("cannot resolve current directory: {e}"))?
                .join(output),
        };
        let backend =
            LocalBackend::new("output", &absolute).map_err(|e| format!("cannot use output directory: {}", *e))?;
        orchestrator = orchestrator.with_local(Arc::new(backend));
    }

    if let Some(bucket) = &args.bucket {
        let backend = S3Backend::from_env(bucket.clone(), bucket, &args.region, args.endpoint.clone())
            .map_err(|e| format!("cannot configure bucket access: {}", *e))?;
        let pages = Pages::new(bucket).map_err(|e| format!("cannot compile gallery templates: {}", *e))?;
        orchestrator = orchestrator.with_remote(Arc::new(backend), pages);
    }

    let report = orchestrator.run(&args.input).await.map_err(|e| format!("{}", *e))?;
    if !report.is_success() {
        for (path, reason) in &report.failures {
            tracing::error!(path = %path.display(), reason = %reason, "File failed");
        }
        tracing::error!(failed = report.failures.len(), "Run finished with failures");
        return Ok(false);
    }
    tracing::info!(
        input = %args.input.display(),
        uploaded = report.uploaded,
        copied = report.copied,
        skipped = report.skipped,
        "Done processing"
    );
    Ok(true)
}
