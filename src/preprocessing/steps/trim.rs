use crate::error::PreprocessError;
use image::{imageops, RgbImage};
use imageproc::point::Point;

use super::contours::{find_framed_contours, polygon_area};
use super::threshold;

/// Pixels at or below this grey level count as padding
const TRIM_CUTOFF: u8 = 0;

/// Crop to the bounding box of the largest external foreground contour
pub fn apply(image: RgbImage) -> Result<RgbImage, PreprocessError> {
    let gray = imageops::grayscale(&image);
    let mask = threshold::binarize(&gray, TRIM_CUTOFF);

    let (x, y, width, height) = content_bounds(&mask).ok_or(PreprocessError::EmptyContent)?;

    if (x, y, width, height) == (0, 0, image.width(), image.height()) {
        return Ok(image);
    }
    Ok(imageops::crop_imm(&image, x, y, width, height).to_image())
}

/// Bounding rectangle (x, y, width, height) of the largest outermost contour
fn content_bounds(mask: &image::GrayImage) -> Option<(u32, u32, u32, u32)> {
    let largest = find_framed_contours(mask)
        .into_iter()
        .filter(|c| c.parent.is_none() && !c.points.is_empty())
        .map(|c| (contour_weight(&c.points), c.points))
        .max_by(|a, b| a.0.total_cmp(&b.0))?;

    let points = largest.1;
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;

    Some((
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Polygon area, with the point count breaking ties between flat contours
/// (single rows or columns of pixels enclose no area)
fn contour_weight(points: &[Point<i32>]) -> f64 {
    polygon_area(points) + points.len() as f64 * 1e-6
}
