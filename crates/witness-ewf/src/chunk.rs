//! Chunk data packing and unpacking
//!
//! A chunk moves between two states: *raw* (the media bytes) and *packed*
//! (the on-disk form). Packing either appends the Adler-32 trailer or
//! replaces the data with a zlib stream; unpacking inverts whichever was
//! done, flagging corruption instead of failing.

use crate::checksum::adler32;
use crate::compress::{compress, decompress, Unpacked};
use witness_core::{CompressionLevel, Error, Format, Result};

/// Flags steering the pack decision
#[derive(Debug, Clone, Copy, Default)]
pub struct PackFlags {
    /// Compress chunks whose bytes are all identical, regardless of level
    pub compress_empty_block: bool,
}

/// Returns true if every byte of the block equals its first byte
pub fn is_empty_block(data: &[u8]) -> bool {
    match data.first() {
        Some(&first) => data.iter().all(|&byte| byte == first),
        None => false,
    }
}

/// The unit of compression and checksumming
#[derive(Debug, Default)]
pub struct ChunkData {
    data: Vec<u8>,
    compressed_data: Option<Vec<u8>>,
    is_packed: bool,
    is_compressed: bool,
    is_corrupt: bool,
    is_empty_zero_block: bool,
}

impl ChunkData {
    /// Creates an empty raw chunk sized for writing `chunk_size` media bytes
    pub fn new(chunk_size: u32) -> Self {
        ChunkData {
            data: Vec::with_capacity(chunk_size as usize + 4),
            ..Default::default()
        }
    }

    /// Creates a raw chunk from media bytes staged for write
    pub fn from_data(data: Vec<u8>) -> Self {
        let mut data = data;
        data.reserve(4);
        ChunkData {
            data,
            ..Default::default()
        }
    }

    /// Creates a packed chunk from bytes read off a segment file
    pub fn from_packed(data: Vec<u8>, compressed: bool) -> Self {
        ChunkData {
            data,
            is_packed: true,
            is_compressed: compressed,
            ..Default::default()
        }
    }

    /// The canonical chunk bytes: media data when raw, on-disk form when packed
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Current valid length of [`ChunkData::data`]
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Appends raw media bytes to a chunk staged for write
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        if self.is_packed {
            return Err(Error::invalid_argument(
                "cannot append data to a packed chunk",
            ));
        }
        self.data.extend_from_slice(data);
        Ok(())
    }

    pub fn is_packed(&self) -> bool {
        self.is_packed
    }

    pub fn is_compressed(&self) -> bool {
        self.is_compressed
    }

    pub fn is_corrupt(&self) -> bool {
        self.is_corrupt
    }

    /// True if the last pack saw a chunk of identical zero bytes
    pub fn is_empty_zero_block(&self) -> bool {
        self.is_empty_zero_block
    }

    /// Replaces the chunk content with `chunk_size` zero bytes.
    /// Used when a corrupt chunk must not leak partially decoded data.
    pub fn wipe(&mut self, chunk_size: u32) {
        self.data.clear();
        self.data.resize(chunk_size as usize, 0);
    }

    /// Packs the chunk data into its on-disk form.
    ///
    /// Either compresses the data or appends the checksum trailer, per the
    /// decision sequence: empty-block detection may upgrade or downgrade the
    /// compression level; the EWF-S01 dialect always compresses; otherwise
    /// compression is only committed when it actually shrinks the chunk.
    /// Packing a packed chunk is a no-op.
    ///
    /// A precomputed `compressed_zero_block` is copied verbatim for full
    /// all-zero chunks, skipping zlib entirely.
    pub fn pack(
        &mut self,
        compression_level: CompressionLevel,
        flags: PackFlags,
        format: Format,
        chunk_size: u32,
        compressed_zero_block: Option<&[u8]>,
    ) -> Result<()> {
        if self.is_packed {
            return Ok(());
        }
        self.is_compressed = false;
        self.is_empty_zero_block = false;

        let mut compression_level = compression_level;

        if !format.is_smart() && flags.compress_empty_block {
            if is_empty_block(&self.data) {
                if compression_level == CompressionLevel::None {
                    compression_level = CompressionLevel::Default;
                }
                if self.data[0] == 0 {
                    self.is_empty_zero_block = true;
                }
            } else {
                compression_level = CompressionLevel::None;
            }
        }
        if format.is_smart() || compression_level != CompressionLevel::None {
            let mut compressed = Vec::with_capacity(2 * self.data.len());

            match compressed_zero_block {
                Some(cached)
                    if self.is_empty_zero_block && self.data.len() == chunk_size as usize =>
                {
                    compressed.extend_from_slice(cached);
                }
                _ => compress(&mut compressed, &self.data, compression_level)?,
            }
            if format.is_smart() || compressed.len() < self.data.len() {
                self.data = compressed;
                self.is_compressed = true;
            }
        }
        if !self.is_compressed {
            let checksum = adler32(1, &self.data);
            self.data.extend_from_slice(&checksum.to_le_bytes());
        }
        self.is_packed = true;

        Ok(())
    }

    /// Unpacks the chunk data back into raw media bytes.
    ///
    /// For uncompressed chunks the trailer checksum is split off and
    /// verified; a mismatch marks the chunk corrupt but is not an error.
    /// For compressed chunks the zlib stream is inflated into a fresh
    /// buffer; corrupt streams likewise only mark the chunk. Unpacking a
    /// raw chunk is a no-op.
    pub fn unpack(&mut self, chunk_size: u32) -> Result<()> {
        if chunk_size == 0 {
            return Err(Error::invalid_argument("chunk size is zero"));
        }
        if !self.is_packed {
            return Ok(());
        }
        if !self.is_compressed {
            if self.data.len() < 4 {
                return Err(Error::out_of_bounds(
                    "packed chunk smaller than its checksum trailer",
                ));
            }
            let data_size = self.data.len() - 4;
            let stored_checksum = u32::from_le_bytes([
                self.data[data_size],
                self.data[data_size + 1],
                self.data[data_size + 2],
                self.data[data_size + 3],
            ]);
            self.data.truncate(data_size);

            let calculated_checksum = adler32(1, &self.data);

            if stored_checksum != calculated_checksum {
                tracing::debug!(
                    "chunk data checksum mismatch (stored: 0x{stored_checksum:08x} calculated: 0x{calculated_checksum:08x})"
                );
                self.is_corrupt = true;
            }
        } else {
            if self.compressed_data.is_some() {
                return Err(Error::value_already_set("chunk compressed data"));
            }
            let compressed = std::mem::take(&mut self.data);

            let mut data = Vec::with_capacity(chunk_size as usize + 4);

            match decompress(&mut data, &compressed)? {
                Unpacked::Ok => {}
                Unpacked::CorruptData => {
                    tracing::debug!("unable to decompress chunk data");
                    self.is_corrupt = true;
                }
            }
            self.data = data;
            self.compressed_data = Some(compressed);
        }
        self.is_packed = false;

        Ok(())
    }
}
