//! Document boundary detection.
//!
//! Two strategies are tried in order: Canny edges closed by dilation, then a
//! global threshold of the blurred image. Both feed the same selection: all
//! contours ranked by enclosed area, the first one whose polygon
//! approximation keeps at least four vertices wins.

use crate::error::PreprocessError;
use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, Contour};
use imageproc::edges::canny;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use serde::Serialize;
use tracing::{debug, warn};

use super::threshold;

const CANNY_LOW: f32 = 75.0;
const CANNY_HIGH: f32 = 200.0;
const DILATE_ITERATIONS: u8 = 2;
const FALLBACK_THRESHOLD: u8 = 127;
/// Polygon tolerance as a fraction of the contour perimeter
const APPROX_EPSILON_RATIO: f64 = 0.02;
const MIN_VERTICES: usize = 4;

/// Which strategy produced the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    Edges,
    Threshold,
}

/// An approximated boundary polygon
#[derive(Debug, Clone)]
pub struct Boundary {
    pub polygon: Vec<Point<i32>>,
    pub area: f64,
    pub strategy: Strategy,
}

/// Find the most probable document boundary in a blurred grayscale image
pub fn detect(blurred: &GrayImage) -> Result<Boundary, PreprocessError> {
    if let Some((polygon, area)) = select_boundary(&edge_mask(blurred)) {
        debug!(vertices = polygon.len(), area, "Boundary found from edges");
        return Ok(Boundary {
            polygon,
            area,
            strategy: Strategy::Edges,
        });
    }

    warn!("Edge detection found no suitable contour, trying binary thresholding");

    let found = threshold_mask(blurred).and_then(|mask| select_boundary(&mask));
    match found {
        Some((polygon, area)) => {
            debug!(vertices = polygon.len(), area, "Boundary found from threshold");
            Ok(Boundary {
                polygon,
                area,
                strategy: Strategy::Threshold,
            })
        }
        None => Err(PreprocessError::NoDocumentBoundary),
    }
}

/// Canny edges, dilated to close small gaps
pub fn edge_mask(blurred: &GrayImage) -> GrayImage {
    let edges = canny(blurred, CANNY_LOW, CANNY_HIGH);
    threshold::dilate_square(&edges, DILATE_ITERATIONS)
}

/// Globally thresholded and dilated mask, or None when the threshold leaves
/// no intensity step to follow
pub fn threshold_mask(blurred: &GrayImage) -> Option<GrayImage> {
    let mask = threshold::binarize(blurred, FALLBACK_THRESHOLD);
    if !threshold::has_step(&mask) {
        return None;
    }
    Some(threshold::dilate_square(&mask, DILATE_ITERATIONS))
}

/// Rank every contour of `mask` by area and return the approximation of the
/// largest one that keeps at least four vertices, with that contour's area.
pub fn select_boundary(mask: &GrayImage) -> Option<(Vec<Point<i32>>, f64)> {
    let mut ranked: Vec<(f64, Vec<Point<i32>>)> = find_framed_contours(mask)
        .into_iter()
        .filter(|c| c.points.len() >= 3)
        .map(|c| (polygon_area(&c.points), c.points))
        .collect();

    // Stable sort: equal areas keep discovery order
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranked.into_iter().find_map(|(area, points)| {
        let perimeter = arc_length(&points, true);
        if perimeter <= 0.0 {
            return None;
        }
        let approx = approximate_closed(&points, APPROX_EPSILON_RATIO * perimeter);
        (approx.len() >= MIN_VERTICES).then_some((approx, area))
    })
}

/// Contours of `mask` traced as if the frame were surrounded by background,
/// so regions touching the image border still get an outer border.
/// Points are returned in `mask` coordinates.
pub fn find_framed_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    let (width, height) = mask.dimensions();
    let mut canvas = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut canvas, mask, 1, 1);

    let (max_x, max_y) = (width as i32 - 1, height as i32 - 1);
    find_contours::<i32>(&canvas)
        .into_iter()
        .map(|mut contour| {
            for p in contour.points.iter_mut() {
                p.x = (p.x - 1).clamp(0, max_x);
                p.y = (p.y - 1).clamp(0, max_y);
            }
            contour
        })
        .collect()
}

/// Shoelace area of a closed polygon
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64)
        .sum();
    twice.abs() / 2.0
}

/// Douglas-Peucker on a closed curve.
///
/// The curve is split at the point farthest from its first point and each
/// open half is simplified on its own, so the split points always survive.
pub fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || epsilon <= 0.0 {
        return dedup_closed(points.to_vec());
    }

    let first = points[0];
    let (split, _) = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let dx = (p.x - first.x) as f64;
            let dy = (p.y - first.y) as f64;
            (i, dx * dx + dy * dy)
        })
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if split == 0 {
        return vec![first];
    }

    let head = approximate_polygon_dp(&points[..=split], epsilon, false);
    let mut tail_chain: Vec<Point<i32>> = points[split..].to_vec();
    tail_chain.push(first);
    let tail = approximate_polygon_dp(&tail_chain, epsilon, false);

    let mut polygon = head;
    // The tail starts at the split point and ends at the first point, both
    // already present in the head.
    if tail.len() > 2 {
        polygon.extend_from_slice(&tail[1..tail.len() - 1]);
    }
    dedup_closed(polygon)
}

fn dedup_closed(mut polygon: Vec<Point<i32>>) -> Vec<Point<i32>> {
    polygon.dedup();
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    polygon
}
