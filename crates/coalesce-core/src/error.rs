//! Error types for coalesce-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Property has no accessor: {0}")]
    UnknownProperty(String),

    #[error("Property declared twice: {0}")]
    DuplicateProperty(String),

    #[error("Instance is already ready")]
    AlreadyReady,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
