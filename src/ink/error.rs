//! Ink file error types

use thiserror::Error;

/// Errors raised by the standalone ink-stroke file format
#[derive(Debug, Error)]
pub enum InkFileError {
    /// Magic mismatch or header/index too short
    #[error("Invalid ink file format: {0}")]
    InvalidFileFormat(String),

    /// Header carries a version this reader does not understand
    #[error("Unsupported ink file version: {0:#06x}")]
    UnsupportedVersion(u16),

    /// Stroke data could not be decoded
    #[error("Corrupted stroke data: {0}")]
    CorruptedData(String),

    /// zlib compression failed while saving
    #[error("Compression error: {0}")]
    Compression(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ink file operations
pub type InkFileResult<T> = std::result::Result<T, InkFileError>;
