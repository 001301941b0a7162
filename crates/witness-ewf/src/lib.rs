//! # Witness EWF
//!
//! Expert Witness Format (EWF / EnCase) core: the chunk codec, the offset
//! table and the metadata value subsystem behind the E01/S01/L01 family of
//! forensic image containers.
//!
//! A logical image is split across a numbered sequence of segment files;
//! within each file the payload is divided into fixed-size chunks (64
//! sectors by default) that are individually compressed or checksummed.
//! An offset table maps each chunk index to the segment, file offset and
//! size that locate its bytes, giving random access into images of any
//! size.
//!
//! ## Layers
//!
//! - [`checksum`] — the EWF dialect of Adler-32 (seed 1, little-endian
//!   trailer)
//! - [`compress`] — the zlib wrapper with its three-outcome decompression
//! - [`chunk`] — the raw ↔ packed chunk state machine
//! - [`table`] — the per-chunk offset table, including EnCase 6 overflow
//!   recovery and table/table2 verification
//! - [`segment`] — the segment file arena and extension naming scheme
//! - [`values`] — header, hash and logical-evidence metadata codecs
//! - [`handle`] — the façade tying the layers together
//!
//! ## Example
//!
//! ```rust,no_run
//! use witness_ewf::Handle;
//! use std::fs::File;
//!
//! # fn main() -> witness_core::Result<()> {
//! let mut handle = Handle::new();
//! let file = File::open("evidence.E01")?;
//! let segment = handle.add_segment(Box::new(file), vec![])?;
//! // ... scan sections, feed table sections, then:
//! let chunk = handle.read_chunk(0)?;
//! println!("chunk 0: {} bytes", chunk.data_size());
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod chunk;
pub mod compress;
pub mod handle;
pub mod segment;
pub mod table;
pub mod values;

// Re-export the façade and the types that appear in its signatures
pub use chunk::{ChunkData, PackFlags};
pub use compress::Unpacked;
pub use handle::{Handle, MediaValues, SectorRange};
pub use segment::{SectionRange, SegmentFileId, SegmentTable};
pub use table::{ChunkLocator, OffsetTable, TableSection};
pub use values::{MediaDigest, SerializedString, ValueDataType, ValueReader, ValueTable};
