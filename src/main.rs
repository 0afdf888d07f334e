use clap::Parser;
use sketch_normalizer::error::ErrorResponse;
use sketch_normalizer::{Config, ErrorKind, ImageSource, Mode, Pipeline, PipelineResult};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sketchnorm")]
#[command(about = "Straighten, crop and enhance photographed sketches")]
#[command(version)]
pub struct Args {
    /// Source image (JPEG, PNG, WEBP, ...)
    pub input: PathBuf,

    /// Destination; the extension selects the output format
    pub output: PathBuf,

    /// Processing mode: "crop" or "rectify"
    #[arg(long, default_value = "rectify", value_parser = parse_mode)]
    pub mode: Mode,

    /// Retry with plain cropping when no sheet boundary is found
    #[arg(long)]
    pub fallback_to_crop: bool,

    /// Maximum width/height ratio before the sides are cropped
    #[arg(long, default_value = "2.5")]
    pub max_aspect_ratio: f64,

    /// Longest side of the output, in pixels
    #[arg(long, default_value = "1024")]
    pub target_size: u32,

    /// JPEG quality (1-100) when writing JPEG output
    #[arg(long, default_value = "95")]
    pub jpeg_quality: u8,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::parse(s).ok_or_else(|| format!("unknown mode '{}', expected 'crop' or 'rectify'", s))
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Config::default()
            .with_max_aspect_ratio(args.max_aspect_ratio)
            .with_target_size(args.target_size)
            .with_jpeg_quality(args.jpeg_quality)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from(&args);
    let source = ImageSource::Path(&args.input);

    let result = Pipeline::new(args.mode)
        .with_config(config.clone())
        .run(source, &args.output);

    let result = match result {
        Err(err) if args.fallback_to_crop && err.kind() == ErrorKind::NoDocumentBoundary => {
            tracing::warn!(error = %err, "Rectification failed, falling back to crop only");
            Pipeline::new(Mode::CropOnly)
                .with_config(config)
                .run(source, &args.output)
        }
        other => other,
    };

    match result {
        Ok(summary) => {
            report(&summary, args.json)?;
            Ok(())
        }
        Err(err) => {
            let response = ErrorResponse::from(&err);
            tracing::error!(code = %response.code, "{}", response.error);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            Err(err.into())
        }
    }
}

fn report(summary: &PipelineResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!(
            "{} ({}x{}, {} in {} ms)",
            summary.destination.display(),
            summary.width,
            summary.height,
            summary.mode,
            summary.total_time_ms
        );
    }
    Ok(())
}
