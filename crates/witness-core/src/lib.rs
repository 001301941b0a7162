//! # Witness Core
//!
//! Shared error handling, configuration enums and I/O traits for the
//! witness Expert Witness Format (EWF) crates.
//!
//! The EWF family of container formats (E01/S01/L01) stores forensic disk
//! images as a numbered sequence of segment files. This crate carries the
//! vocabulary those formats share: format variants, compression levels,
//! media descriptions, header codepages and the error taxonomy used across
//! the workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{Error, Result};
pub use traits::ReadSeek;
pub use types::{
    CompressionLevel, DateFormat, ErrorTolerance, Format, HeaderCodepage, MediaFlags, MediaType,
    SegmentFileType, VolumeType, MAXIMUM_TABLE_ENTRIES, MAXIMUM_TABLE_ENTRIES_ENCASE6,
    MINIMUM_CHUNK_SIZE,
};
