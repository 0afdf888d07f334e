use crate::config::Config;
use crate::error::PreprocessError;
use crate::output;
use image::RgbImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use super::steps::{self, load::ImageSource};

/// Which composition of stages to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Trim, enhance and resize the image as captured
    #[default]
    CropOnly,
    /// Detect the sheet, straighten it, then crop
    RectifyAndCrop,
}

impl Mode {
    /// Parse from a user-supplied name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "crop" | "crop-only" | "crop_only" => Some(Self::CropOnly),
            "rectify" | "rectify-and-crop" | "rectify_and_crop" => Some(Self::RectifyAndCrop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CropOnly => "crop_only",
            Self::RectifyAndCrop => "rectify_and_crop",
        }
    }
}

/// Timing information for a single stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// In-memory result of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    #[serde(skip)]
    pub image: RgbImage,
    pub mode: String,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Outcome of a run that was written to disk
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub destination: PathBuf,
    pub width: u32,
    pub height: u32,
    pub mode: String,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Stateless composition of the normalization stages
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    mode: Mode,
    config: Config,
}

impl Pipeline {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage and return the final image without writing it
    pub fn process(&self, source: ImageSource<'_>) -> Result<PipelineOutput, PreprocessError> {
        self.config.validate()?;

        let start = Instant::now();
        let mut timings = Vec::new();

        let loaded = self.run_step("load", &mut timings, || steps::load::apply(source))?;
        ensure_area("load", &loaded.color)?;

        let mut img = loaded.color;

        if self.mode == Mode::RectifyAndCrop {
            let blurred = loaded.blurred;
            let boundary =
                self.run_step("detect", &mut timings, || steps::contours::detect(&blurred))?;
            debug!(strategy = ?boundary.strategy, vertices = boundary.polygon.len(), "Boundary selected");

            img = self.run_step("rectify", &mut timings, || {
                steps::rectify::apply(&img, &boundary.polygon)
            })?;
            ensure_area("rectify", &img)?;
        }

        img = self.run_step("trim", &mut timings, || steps::trim::apply(img))?;
        ensure_area("trim", &img)?;

        img = self.run_step("contrast", &mut timings, || steps::contrast::apply(img))?;

        img = self.run_step("resize", &mut timings, || {
            steps::resize::apply(img, &self.config)
        })?;
        ensure_area("resize", &img)?;

        Ok(PipelineOutput {
            image: img,
            mode: self.mode.as_str().to_string(),
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        })
    }

    /// Process `source` and write the result to `destination`
    pub fn run(
        &self,
        source: ImageSource<'_>,
        destination: &Path,
    ) -> Result<PipelineResult, PreprocessError> {
        let start = Instant::now();
        let output = self.process(source)?;

        let mut steps = output.steps;
        let write_start = Instant::now();
        output::write(&output.image, destination, &self.config)?;
        steps.push(StepTiming {
            name: "write".to_string(),
            time_ms: write_start.elapsed().as_millis() as u64,
        });

        let total_time_ms = start.elapsed().as_millis() as u64;
        info!(
            mode = self.mode.as_str(),
            destination = %destination.display(),
            total_time_ms,
            "Processed image saved"
        );

        Ok(PipelineResult {
            destination: destination.to_path_buf(),
            width: output.image.width(),
            height: output.image.height(),
            mode: output.mode,
            total_time_ms,
            steps,
        })
    }

    fn run_step<T, F>(
        &self,
        name: &str,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<T, PreprocessError>
    where
        F: FnOnce() -> Result<T, PreprocessError>,
    {
        let step_start = Instant::now();
        let result = step_fn()?;
        let time_ms = step_start.elapsed().as_millis() as u64;
        debug!(step = name, time_ms, "Step complete");
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}

fn ensure_area(stage: &'static str, image: &RgbImage) -> Result<(), PreprocessError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessError::ZeroArea { stage });
    }
    Ok(())
}

/// Trim, enhance and resize `source`, writing the result to `destination`
pub fn crop_only<'a>(
    source: impl Into<ImageSource<'a>>,
    destination: impl AsRef<Path>,
) -> Result<PathBuf, PreprocessError> {
    Pipeline::new(Mode::CropOnly)
        .run(source.into(), destination.as_ref())
        .map(|r| r.destination)
}

/// Straighten the detected sheet, then trim, enhance and resize it
pub fn rectify_and_crop<'a>(
    source: impl Into<ImageSource<'a>>,
    destination: impl AsRef<Path>,
) -> Result<PathBuf, PreprocessError> {
    Pipeline::new(Mode::RectifyAndCrop)
        .run(source.into(), destination.as_ref())
        .map(|r| r.destination)
}

/// Re-encode `source` in the format implied by `destination`, unprocessed
pub fn convert<'a>(
    source: impl Into<ImageSource<'a>>,
    destination: impl AsRef<Path>,
) -> Result<PathBuf, PreprocessError> {
    let destination = destination.as_ref();
    let image = steps::load::decode(source.into())?;
    output::write(&image, destination, &Config::default())?;
    info!(destination = %destination.display(), "Image converted");
    Ok(destination.to_path_buf())
}
