//! Fatal startup errors
//!
//! Everything here is terminal: `main` logs the error and exits. There is
//! no retry policy and no partial-rendering fallback.

use std::path::PathBuf;

/// Errors that can abort startup before the first frame.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed settings file {path}: {source}")]
    Settings {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("GPU initialization failed: {0}")]
    Gpu(String),
}
