//! Error types for the WGAN trainer

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, WganError>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum WganError {
    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dataset cannot fill a single batch
    #[error("Dataset has {len} images but the batch size is {batch}")]
    DatasetTooSmall { len: usize, batch: usize },

    /// Dataset contains no images
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    /// Image tensors do not match the shape the networks expect
    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch { expected: Vec<i64>, found: Vec<i64> },

    /// Tensor backend error
    #[error("Tensor backend error: {0}")]
    Tch(#[from] tch::TchError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WganError {
    /// Whether the error is detected before training starts
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            WganError::InvalidConfig(_)
                | WganError::DatasetTooSmall { .. }
                | WganError::EmptyDataset(_)
                | WganError::ShapeMismatch { .. }
        )
    }
}
