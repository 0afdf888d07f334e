//! Sketch photo normalization
//!
//! Stages live in `steps`, one file each; `pipeline` composes them into the
//! crop-only and rectify-and-crop variants.

pub mod pipeline;
pub mod steps;

pub use pipeline::{
    convert, crop_only, rectify_and_crop, Mode, Pipeline, PipelineOutput, PipelineResult,
    StepTiming,
};
pub use steps::load::ImageSource;
