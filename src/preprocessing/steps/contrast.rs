//! Local contrast enhancement.
//!
//! CLAHE runs on the lightness channel of CIE L*a*b* only, so hue and
//! saturation of coloured strokes are left alone.

use crate::error::PreprocessError;
use image::{GrayImage, Luma, Rgb, RgbImage};

const CLIP_LIMIT: f32 = 2.0;
const TILE_GRID: u32 = 8;
const BINS: usize = 256;

/// Apply CLAHE to the lightness channel and convert back to RGB
pub fn apply(image: RgbImage) -> Result<RgbImage, PreprocessError> {
    let (width, height) = image.dimensions();
    let mut lightness = GrayImage::new(width, height);
    let mut chroma = Vec::with_capacity((width * height) as usize);

    for (x, y, pixel) in image.enumerate_pixels() {
        let (l, a, b) = rgb_to_lab(*pixel);
        lightness.put_pixel(x, y, Luma([(l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8]));
        chroma.push((a, b));
    }

    let equalized = clahe(&lightness, CLIP_LIMIT, TILE_GRID);

    Ok(RgbImage::from_fn(width, height, |x, y| {
        let l = equalized.get_pixel(x, y).0[0] as f32 * 100.0 / 255.0;
        let (a, b) = chroma[(y * width + x) as usize];
        lab_to_rgb(l, a, b)
    }))
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `grid` x `grid` layout of tiles (fewer when the
/// image is smaller than the grid). Each tile gets a clipped, equalized
/// lookup table; every pixel blends the tables of its four nearest tile
/// centres bilinearly.
pub fn clahe(img: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    let (tile_w, tiles_x) = tile_layout(width, grid);
    let (tile_h, tiles_y) = tile_layout(height, grid);

    let mut luts = vec![[0u8; BINS]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = (tx * tile_w).min(width);
            let y0 = (ty * tile_h).min(height);
            let x1 = ((tx + 1) * tile_w).min(width);
            let y1 = ((ty + 1) * tile_h).min(height);
            luts[(ty * tiles_x + tx) as usize] = tile_lut(img, x0, y0, x1, y1, clip_limit);
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    GrayImage::from_fn(width, height, |x, y| {
        let value = img.get_pixel(x, y).0[0] as usize;

        let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let (tx0, tx1, wx) = neighbours(fx, tiles_x);
        let (ty0, ty1, wy) = neighbours(fy, tiles_y);

        let top = lut_at(tx0, ty0)[value] as f32 * (1.0 - wx) + lut_at(tx1, ty0)[value] as f32 * wx;
        let bottom =
            lut_at(tx0, ty1)[value] as f32 * (1.0 - wx) + lut_at(tx1, ty1)[value] as f32 * wx;
        let blended = top * (1.0 - wy) + bottom * wy;

        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Tile length and tile count along one axis. The count is derived from the
/// length so the last tile always starts inside the image.
fn tile_layout(len: u32, grid: u32) -> (u32, u32) {
    let tile = len.div_ceil(grid.min(len).max(1)).max(1);
    (tile, len.div_ceil(tile).max(1))
}

/// Lower and upper tile index around a fractional tile coordinate, with the
/// weight of the upper one
fn neighbours(f: f32, tiles: u32) -> (u32, u32, f32) {
    let last = tiles as i64 - 1;
    let lower = f.floor() as i64;
    let weight = f - lower as f32;
    let t0 = lower.clamp(0, last) as u32;
    let t1 = (lower + 1).clamp(0, last) as u32;
    (t0, t1, weight)
}

fn tile_lut(img: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; BINS] {
    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let area = (x1 - x0) * (y1 - y0);
    let mut lut = [0u8; BINS];
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    clip_histogram(&mut hist, clip_limit, area);

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    for (bin, count) in hist.iter().enumerate() {
        cumulative += count;
        lut[bin] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Clip each bin at `clip_limit * area / BINS` and spread the excess evenly
fn clip_histogram(hist: &mut [u32; BINS], clip_limit: f32, area: u32) {
    let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);

    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let per_bin = excess / BINS as u32;
    let residual = (excess % BINS as u32) as usize;
    for count in hist.iter_mut() {
        *count += per_bin;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for bin in (0..BINS).step_by(step).take(residual) {
            hist[bin] += 1;
        }
    }
}

// sRGB <-> CIE L*a*b* (D65)

const WHITE_X: f32 = 0.950_456;
const WHITE_Z: f32 = 1.088_754;

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

pub fn rgb_to_lab(pixel: Rgb<u8>) -> (f32, f32, f32) {
    let [r, g, b] = pixel.0.map(srgb_to_linear);

    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / WHITE_X;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / WHITE_Z;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

pub fn lab_to_rgb(l: f32, a: f32, b: f32) -> Rgb<u8> {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = lab_f_inv(fx) * WHITE_X;
    let y = lab_f_inv(fy);
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_992 * y + 0.041_556 * z;
    let b = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    Rgb([linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)])
}
