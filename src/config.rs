use crate::error::PreprocessError;

/// Output shaping parameters for the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Widest allowed width/height ratio before the sides are cropped
    pub max_aspect_ratio: f64,
    /// Length of the longest side of the final image, in pixels
    pub target_size: u32,
    /// Quality used when the destination is a JPEG
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_aspect_ratio: 2.5,
            target_size: 1024,
            jpeg_quality: 95,
        }
    }
}

impl Config {
    pub fn with_max_aspect_ratio(mut self, ratio: f64) -> Self {
        self.max_aspect_ratio = ratio;
        self
    }

    pub fn with_target_size(mut self, size: u32) -> Self {
        self.target_size = size;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn validate(&self) -> Result<(), PreprocessError> {
        if !self.max_aspect_ratio.is_finite() || self.max_aspect_ratio <= 0.0 {
            return Err(PreprocessError::InvalidConfig(format!(
                "max_aspect_ratio must be positive, got {}",
                self.max_aspect_ratio
            )));
        }
        if self.target_size == 0 {
            return Err(PreprocessError::InvalidConfig(
                "target_size must be non-zero".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PreprocessError::InvalidConfig(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
