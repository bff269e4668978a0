use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid store signature: expected \"VM\", got {found:?}")]
    InvalidSignature { found: [u8; 2] },

    #[error("Truncated store: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Invalid page size: expected {expected}, got {actual}")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("Element index out of range: {index}")]
    OutOfRange { index: usize },

    #[error("Cannot assign an empty value to element {index}")]
    InvalidAssignment { index: usize },

    #[error("Invalid buffer slot: {0}")]
    InvalidSlot(usize),
}

pub type FileResult<T> = Result<T, FileError>;
