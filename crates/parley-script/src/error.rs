//! Error types for parley-script

use thiserror::Error;

/// Script loading error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Core(#[from] parley_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
