use crate::error::PreprocessError;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::geometry::{convex_hull, min_area_rect};
use imageproc::point::Point;
use tracing::debug;

/// Sides shorter than this are treated as a collapsed quadrilateral
const MIN_SIDE_PX: u32 = 2;

/// Four corners in top-left, top-right, bottom-right, bottom-left order
pub type Quad = [(f32, f32); 4];

/// Warp the region bounded by `polygon` onto an upright rectangle
pub fn apply(image: &RgbImage, polygon: &[Point<i32>]) -> Result<RgbImage, PreprocessError> {
    let quad = order_corners(reduce_to_quad(polygon)?);
    let (width, height) = target_size(&quad);

    debug!(?quad, width, height, "Rectifying quadrilateral");

    if width < MIN_SIDE_PX || height < MIN_SIDE_PX {
        return Err(PreprocessError::DegenerateQuadrilateral { width, height });
    }

    let (w, h) = ((width - 1) as f32, (height - 1) as f32);
    let dest: Quad = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    let projection = Projection::from_control_points(quad, dest)
        .ok_or(PreprocessError::DegenerateQuadrilateral { width, height })?;

    let mut output = RgbImage::new(width, height);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut output,
    );
    Ok(output)
}

/// Exactly four points are used as-is; more are reduced through the
/// minimum-area rectangle of their convex hull.
fn reduce_to_quad(polygon: &[Point<i32>]) -> Result<[(f32, f32); 4], PreprocessError> {
    let corners: [Point<i32>; 4] = match polygon.len() {
        4 => [polygon[0], polygon[1], polygon[2], polygon[3]],
        n if n > 4 => min_area_rect(&convex_hull(polygon)),
        _ => {
            return Err(PreprocessError::DegenerateQuadrilateral {
                width: 0,
                height: 0,
            })
        }
    };
    Ok(corners.map(|p| (p.x as f32, p.y as f32)))
}

/// Sort corners by polar angle around their centroid, then rotate the cycle
/// so it starts at the corner nearest the image origin.
///
/// With y pointing down, increasing angle runs clockwise on screen, which
/// yields top-left, top-right, bottom-right, bottom-left.
pub fn order_corners(mut corners: [(f32, f32); 4]) -> Quad {
    let cx = corners.iter().map(|c| c.0).sum::<f32>() / 4.0;
    let cy = corners.iter().map(|c| c.1).sum::<f32>() / 4.0;

    corners.sort_by(|a, b| {
        let angle_a = (a.1 - cy).atan2(a.0 - cx);
        let angle_b = (b.1 - cy).atan2(b.0 - cx);
        angle_a.total_cmp(&angle_b)
    });

    let start = corners
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (a.0 * a.0 + a.1 * a.1).total_cmp(&(b.0 * b.0 + b.1 * b.1)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    corners.rotate_left(start);
    corners
}

/// Longer of the opposite edges, truncated to whole pixels
pub fn target_size(quad: &Quad) -> (u32, u32) {
    let [tl, tr, br, bl] = *quad;
    let width = distance(tl, tr).max(distance(bl, br));
    let height = distance(tl, bl).max(distance(tr, br));
    (width as u32, height as u32)
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
