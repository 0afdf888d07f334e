use crate::config::Config;
use crate::error::PreprocessError;
use image::{imageops, imageops::FilterType, RgbImage};

/// Crop overly wide images to `max_aspect_ratio`, centred, then scale so the
/// longest side equals `target_size`
pub fn apply(image: RgbImage, config: &Config) -> Result<RgbImage, PreprocessError> {
    let image = crop_to_ratio(image, config.max_aspect_ratio);
    Ok(scale_longest_side(image, config.target_size))
}

pub fn crop_to_ratio(image: RgbImage, max_ratio: f64) -> RgbImage {
    let (width, height) = image.dimensions();
    if width as f64 / height as f64 <= max_ratio {
        return image;
    }

    let new_width = ((height as f64 * max_ratio) as u32).clamp(1, width);
    let x_offset = (width - new_width) / 2;
    imageops::crop_imm(&image, x_offset, 0, new_width, height).to_image()
}

pub fn scale_longest_side(image: RgbImage, target: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = scaled_dimensions(width, height, target);

    if (new_width, new_height) == (width, height) {
        return image;
    }

    if new_width <= width && new_height <= height {
        // Box averaging over source pixels
        imageops::thumbnail(&image, new_width, new_height)
    } else {
        imageops::resize(&image, new_width, new_height, FilterType::Triangle)
    }
}

/// Longest side becomes exactly `target`; the other side is rounded, never 0
pub fn scaled_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scale_other = |other: u32, longest: u32| {
        ((other as f64 * target as f64 / longest as f64).round() as u32).max(1)
    };
    if width >= height {
        (target, scale_other(height, width))
    } else {
        (scale_other(width, height), target)
    }
}
