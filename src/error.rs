use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("No document boundary found by edge detection or thresholding")]
    NoDocumentBoundary,

    #[error("Detected quadrilateral is degenerate: {width}x{height}")]
    DegenerateQuadrilateral { width: u32, height: u32 },

    #[error("No foreground content found while trimming")]
    EmptyContent,

    #[error("Stage '{stage}' produced a zero-area image")]
    ZeroArea { stage: &'static str },

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Decode,
    NoDocumentBoundary,
    EmptyContent,
    Encode,
    InvalidConfig,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "DECODE_ERROR",
            Self::NoDocumentBoundary => "NO_DOCUMENT_BOUNDARY",
            Self::EmptyContent => "EMPTY_CONTENT",
            Self::Encode => "ENCODE_ERROR",
            Self::InvalidConfig => "INVALID_CONFIG",
        }
    }
}

impl PreprocessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PreprocessError::Decode(_) => ErrorKind::Decode,
            PreprocessError::NoDocumentBoundary
            | PreprocessError::DegenerateQuadrilateral { .. } => ErrorKind::NoDocumentBoundary,
            PreprocessError::EmptyContent | PreprocessError::ZeroArea { .. } => {
                ErrorKind::EmptyContent
            }
            PreprocessError::Encode(_) => ErrorKind::Encode,
            PreprocessError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }
}

/// JSON shape of a failure, as printed by the CLI
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<&PreprocessError> for ErrorResponse {
    fn from(err: &PreprocessError) -> Self {
        Self {
            error: err.to_string(),
            code: err.kind().as_str().to_string(),
        }
    }
}
