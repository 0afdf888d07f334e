use crate::error::PreprocessError;
use image::{GrayImage, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use std::path::Path;

/// Sigma of the fixed 5x5 Gaussian kernel (0.3 * ((5 - 1) * 0.5 - 1) + 0.8)
const BLUR_SIGMA: f32 = 1.1;

/// Where the source image comes from
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

impl<'a> From<&'a Path> for ImageSource<'a> {
    fn from(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<&'a std::path::PathBuf> for ImageSource<'a> {
    fn from(path: &'a std::path::PathBuf) -> Self {
        Self::Path(path.as_path())
    }
}

impl<'a> From<&'a str> for ImageSource<'a> {
    fn from(path: &'a str) -> Self {
        Self::Path(Path::new(path))
    }
}

impl<'a> From<&'a [u8]> for ImageSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for ImageSource<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes.as_slice())
    }
}

/// Decoded source plus the blurred grayscale working copy
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub color: RgbImage,
    pub blurred: GrayImage,
}

/// Decode the source into 8-bit RGB without deriving the working copy
pub fn decode(source: ImageSource<'_>) -> Result<RgbImage, PreprocessError> {
    let image = match source {
        ImageSource::Path(path) => image::open(path).map_err(|e| {
            PreprocessError::Decode(format!("{}: {}", path.display(), e))
        })?,
        ImageSource::Bytes(bytes) => image::load_from_memory(bytes)
            .map_err(|e| PreprocessError::Decode(e.to_string()))?,
    };

    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessError::Decode("image has zero area".to_string()));
    }

    Ok(image.to_rgb8())
}

/// Decode the source and build the grayscale + blurred derivative
pub fn apply(source: ImageSource<'_>) -> Result<LoadedImage, PreprocessError> {
    let color = decode(source)?;
    let blurred = blur(&image::imageops::grayscale(&color));
    Ok(LoadedImage { color, blurred })
}

pub fn blur(gray: &GrayImage) -> GrayImage {
    gaussian_blur_f32(gray, BLUR_SIGMA)
}
