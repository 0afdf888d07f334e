use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

/// Global binary threshold: pixels strictly above `cutoff` become 255, the rest 0
pub fn binarize(img: &GrayImage, cutoff: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y).0[0] > cutoff {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Dilate with a 3x3 square structuring element, repeated `iterations` times.
///
/// Repeating a 3x3 square dilation n times equals a single dilation with a
/// (2n+1)x(2n+1) square, which is what the L-infinity norm of radius n gives.
pub fn dilate_square(mask: &GrayImage, iterations: u8) -> GrayImage {
    if iterations == 0 {
        return mask.clone();
    }
    dilate(mask, Norm::LInf, iterations)
}

/// True when the mask has both foreground and background pixels
pub fn has_step(mask: &GrayImage) -> bool {
    let mut seen_fg = false;
    let mut seen_bg = false;
    for pixel in mask.pixels() {
        if pixel.0[0] > 0 {
            seen_fg = true;
        } else {
            seen_bg = true;
        }
        if seen_fg && seen_bg {
            return true;
        }
    }
    false
}
