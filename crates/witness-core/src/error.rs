//! Error types shared by the witness crates

use thiserror::Error;

/// The main error type for witness operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from a segment file reader
    #[error("Segment I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller passed a null, empty or out-of-range input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Attempt to reassign a single-assignment field
    #[error("Value already set: {0}")]
    ValueAlreadySet(String),

    /// A size or offset escapes its type range
    #[error("Value out of bounds: {0}")]
    OutOfBounds(String),

    /// Structurally invalid on-disk data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Compression of chunk or section data failed
    #[error("Compression failed: {0}")]
    Compress(String),

    /// Decompression failed for a reason other than corrupt input
    #[error("Decompression failed: {0}")]
    Decompress(String),

    /// Unknown format code, header type or date encoding
    #[error("Unsupported: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for witness operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a value already set error
    pub fn value_already_set(msg: impl Into<String>) -> Self {
        Error::ValueAlreadySet(msg.into())
    }

    /// Create an out of bounds error
    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        Error::OutOfBounds(msg.into())
    }

    /// Create an invalid data error
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Error::InvalidData(msg.into())
    }

    /// Create an unsupported format error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedFormat(msg.into())
    }
}
