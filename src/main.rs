// Command-line front end for the image converter.
// The lib.rs file holds the conversion engine; this only wires it to a terminal.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use image_converter_lib::{
    convert_batch,
    BatchEvent,
    BatchReporter,
    CancellationToken,
    ConvertSettings,
    Progress,
};
use image_converter_lib::core::ProgressType;

#[derive(Debug, Parser)]
#[command(name = "image-converter", version, about = "Batch image conversion, cutting and size-targeted compression")]
struct Cli {
    /// Images to convert
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON settings file (camelCase keys); flags below override it
    #[arg(long, env = "IMAGE_CONVERTER_SETTINGS")]
    settings: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, gif, tiff, webp or original
    #[arg(short, long)]
    format: Option<String>,

    /// Quality dial for JPEG and WebP (1-100)
    #[arg(short, long)]
    quality: Option<u32>,

    /// Compress every output to at most this many kilobytes
    #[arg(long = "target-kb")]
    target_kb: Option<u64>,

    /// Cut every image in half: horizontal or vertical
    #[arg(long)]
    cut: Option<String>,

    /// Drop embedded colour profiles
    #[arg(long)]
    strip_metadata: bool,

    /// Output directory (default: "processed images" next to the first input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(long, env = "IMAGE_CONVERTER_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    async fn load_settings(&self) -> anyhow::Result<ConvertSettings> {
        let mut settings = match &self.settings {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading settings file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing settings file {}", path.display()))?
            }
            None => ConvertSettings::default(),
        };

        if let Some(format) = &self.format {
            settings.output_format = format.clone();
        }
        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
        if self.target_kb.is_some() {
            settings.target_size_kb = self.target_kb;
        }
        if let Some(cut) = &self.cut {
            settings.cut_mode = cut.clone();
        }
        if self.strip_metadata {
            settings.strip_metadata = true;
        }
        if self.output.is_some() {
            settings.output_dir = self.output.clone();
        }
        if self.concurrency.is_some() {
            settings.concurrency = self.concurrency;
        }
        Ok(settings)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)         // Remove file path
        .with_line_number(false)  // Remove line numbers
        .with_thread_ids(false)
        .with_target(false)       // Remove module path
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn log_progress(progress: &Progress) {
    let file = progress.current_file.as_deref().unwrap_or("");
    match progress.progress_type {
        ProgressType::Start => debug!("Queued {} files", progress.total_tasks),
        ProgressType::Progress => info!(
            "[{}/{}] {}% {}",
            progress.completed_tasks, progress.total_tasks, progress.progress_percentage, file
        ),
        ProgressType::Error => warn!(
            "[{}/{}] {} failed: {}",
            progress.completed_tasks,
            progress.total_tasks,
            file,
            progress.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("=== Image Converter Starting ===");
    let settings = cli.load_settings().await?;
    debug!("Settings: {:?}", settings);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing in-flight images, skipping the rest");
            on_signal.cancel();
        }
    });

    let outcome = convert_batch(&cli.inputs, &settings, &cancel, |event| {
        if let BatchEvent::Progress(progress) = &event {
            log_progress(progress);
        }
    })
    .await
    .context("invalid configuration")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    } else {
        print!("{}", BatchReporter::new(&outcome.summary));
    }

    Ok(if outcome.summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
