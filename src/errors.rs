use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the driving-perception batch runner.
///
/// Each variant captures the context of its error domain (filesystem,
/// image processing, model operations) so callers never have to parse
/// error strings. Display implementations come from thiserror.
#[derive(Error, Debug)]
pub enum DriveSegError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, DriveSegError>;

/// Errors from helpers built on anyhow are folded into the configuration
/// variant at the crate boundary.
impl From<anyhow::Error> for DriveSegError {
    fn from(err: anyhow::Error) -> Self {
        DriveSegError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Fallback for I/O errors that surface without path context. Code that
/// has the path should construct `FileSystem` directly.
impl From<std::io::Error> for DriveSegError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for DriveSegError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for DriveSegError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors occur during tensor handling inside inference, so they
/// land in the model category.
impl From<ndarray::ShapeError> for DriveSegError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}
