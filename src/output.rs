//! Encoding and atomic writing of finished images.

use crate::config::Config;
use crate::error::PreprocessError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Encode `image` in the format implied by `destination`'s extension
pub fn encode(
    image: &RgbImage,
    destination: &Path,
    config: &Config,
) -> Result<Vec<u8>, PreprocessError> {
    let format = ImageFormat::from_path(destination).map_err(|e| {
        PreprocessError::Encode(format!(
            "cannot infer image format from {}: {}",
            destination.display(),
            e
        ))
    })?;

    let mut buffer = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, config.jpeg_quality);
            image
                .write_with_encoder(encoder)
                .map_err(|e| PreprocessError::Encode(format!("JPEG encoding failed: {}", e)))?;
        }
        _ => {
            DynamicImage::ImageRgb8(image.clone())
                .write_to(&mut Cursor::new(&mut buffer), format)
                .map_err(|e| {
                    PreprocessError::Encode(format!("{:?} encoding failed: {}", format, e))
                })?;
        }
    }
    Ok(buffer)
}

/// Encode and write to `destination`.
///
/// The bytes go to a temporary file next to the destination that is renamed
/// over it only once fully written; on error the destination is untouched.
pub fn write(image: &RgbImage, destination: &Path, config: &Config) -> Result<(), PreprocessError> {
    let bytes = encode(image, destination, config)?;

    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| {
        PreprocessError::Encode(format!("cannot create file in {}: {}", parent.display(), e))
    })?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| PreprocessError::Encode(format!("write failed: {}", e)))?;
    tmp.persist(destination).map_err(|e| {
        PreprocessError::Encode(format!("cannot write {}: {}", destination.display(), e.error))
    })?;

    debug!(path = %destination.display(), bytes = bytes.len(), "Image written");
    Ok(())
}
