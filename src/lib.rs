//! Normalizes photographs of hand-drawn sketches into clean, upright,
//! cropped and contrast-enhanced images.
//!
//! ```no_run
//! use sketch_normalizer::{rectify_and_crop, crop_only, ErrorKind};
//!
//! let out = match rectify_and_crop("photo.jpg", "sketch.webp") {
//!     Err(e) if e.kind() == ErrorKind::NoDocumentBoundary => crop_only("photo.jpg", "sketch.webp"),
//!     other => other,
//! };
//! # let _ = out;
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod preprocessing;

pub use config::Config;
pub use error::{ErrorKind, PreprocessError};
pub use preprocessing::{
    convert, crop_only, rectify_and_crop, ImageSource, Mode, Pipeline, PipelineOutput,
    PipelineResult, StepTiming,
};
