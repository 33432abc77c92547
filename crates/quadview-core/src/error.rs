//! Error types shared by the renderer crates.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
