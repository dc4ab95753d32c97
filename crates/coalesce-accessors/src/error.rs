//! Error types for coalesce-accessors

use thiserror::Error;

/// Accessor generation error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid property name: {0:?}")]
    InvalidName(String),

    #[error("core error: {0}")]
    Core(#[from] coalesce_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
