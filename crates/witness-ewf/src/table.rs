//! Chunk offset table
//!
//! Each segment file carries one or more table sections whose 32-bit
//! entries locate the chunks relative to a base offset, with the high bit
//! flagging compression. The in-memory offset table flattens every table
//! section across every segment file into one array indexed by global
//! chunk number.

use crate::segment::{SectionRange, SegmentFileId, SegmentTable};
use witness_core::{Error, ErrorTolerance, Result};

/// Mask selecting the 31-bit offset part of a table entry
const OFFSET_MASK: u32 = 0x7fff_ffff;

/// High bit flagging a compressed chunk
const COMPRESSED_MASK: u32 = 0x8000_0000;

/// Locates one chunk within a segment file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkLocator {
    /// The segment file holding the chunk bytes
    pub segment_file: SegmentFileId,
    /// Absolute byte offset within that segment file
    pub file_offset: i64,
    /// On-disk chunk size, including the 4-byte trailer when uncompressed.
    /// Zero while the size of a table's last chunk is still pending.
    pub size: u32,
    /// True if the chunk is stored as a zlib stream
    pub compressed: bool,
}

/// On-disk table section payload: base offset plus the raw entry array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSection {
    pub base_offset: i64,
    pub entries: Vec<u32>,
}

impl TableSection {
    /// Parses a table section payload.
    ///
    /// Layout: entry count (u32), 4 reserved bytes, base offset (u64),
    /// 4 reserved bytes, checksum (u32), then the entry array.
    pub fn parse(data: &[u8], maximum_entries: u32) -> Result<Self> {
        if data.len() < 24 {
            return Err(Error::invalid_data("table section too short"));
        }
        let entry_count = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let base_offset = u64::from_le_bytes([
            data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
        ]);

        if entry_count == 0 {
            return Err(Error::invalid_data("table section without entries"));
        }
        if entry_count > maximum_entries {
            return Err(Error::out_of_bounds(format!(
                "table section entry count {entry_count} exceeds maximum {maximum_entries}"
            )));
        }
        if base_offset > i64::MAX as u64 {
            return Err(Error::out_of_bounds("table base offset exceeds maximum"));
        }
        let entries_size = entry_count as usize * 4;
        if data.len() < 24 + entries_size {
            return Err(Error::invalid_data(
                "table section smaller than its entry count",
            ));
        }
        let entries = data[24..24 + entries_size]
            .chunks_exact(4)
            .map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect();

        Ok(TableSection {
            base_offset: base_offset as i64,
            entries,
        })
    }
}

/// The flattened per-chunk index spanning all segment files
#[derive(Default)]
pub struct OffsetTable {
    chunks: Vec<ChunkLocator>,
}

impl OffsetTable {
    pub fn new() -> Self {
        OffsetTable::default()
    }

    /// Number of chunks currently located
    pub fn number_of_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The locator for a global chunk index
    pub fn locator(&self, chunk: usize) -> Result<&ChunkLocator> {
        self.chunks
            .get(chunk)
            .ok_or_else(|| Error::invalid_argument(format!("chunk {chunk} not in offset table")))
    }

    /// Appends the locators described by one table section's entries.
    ///
    /// Chunk sizes come from the difference between consecutive entries;
    /// the final entry is appended with size zero, to be patched by
    /// [`OffsetTable::calculate_last_offset`]. Detects the EnCase 6
    /// truncated-offset problem: when a masked offset runs backwards but
    /// the raw 32-bit value does not, the raw value is used, and once a
    /// chunk ends past `i32::MAX` every following entry is read as a full
    /// 32-bit offset with no compression flag.
    pub fn fill(
        &mut self,
        base_offset: i64,
        entries: &[u32],
        segment_file: SegmentFileId,
        tolerance: ErrorTolerance,
    ) -> Result<()> {
        if base_offset < 0 {
            return Err(Error::invalid_argument("negative table base offset"));
        }
        if entries.is_empty() {
            return Err(Error::invalid_argument("empty table entry array"));
        }
        self.chunks.reserve(entries.len());

        let mut overflow = false;

        for index in 0..entries.len() - 1 {
            let raw_offset = entries[index];
            let raw_next = entries[index + 1];

            let (compressed, current_offset) = if overflow {
                (false, raw_offset)
            } else {
                (raw_offset & COMPRESSED_MASK != 0, raw_offset & OFFSET_MASK)
            };
            let next_offset = if overflow { raw_next } else { raw_next & OFFSET_MASK };

            let chunk_size = if next_offset < current_offset {
                if raw_next < current_offset {
                    return Err(Error::invalid_data(format!(
                        "chunk offset {current_offset} larger than raw next offset {raw_next}"
                    )));
                }
                tracing::warn!(
                    current_offset,
                    next_offset,
                    "table offset runs backwards, compensating for truncated 31-bit offsets"
                );
                raw_next - current_offset
            } else {
                next_offset - current_offset
            };

            if chunk_size == 0 {
                tracing::warn!(chunk = self.chunks.len(), "table entry with zero chunk size");
                if tolerance < ErrorTolerance::Compensate {
                    return Err(Error::invalid_data("invalid chunk size: size is zero"));
                }
            }
            if chunk_size > i32::MAX as u32 {
                return Err(Error::out_of_bounds("chunk size exceeds maximum"));
            }
            self.chunks.push(ChunkLocator {
                segment_file,
                file_offset: base_offset + current_offset as i64,
                size: chunk_size,
                compressed,
            });

            if !overflow && current_offset as u64 + chunk_size as u64 > i32::MAX as u64 {
                tracing::warn!(current_offset, "chunk offset overflow, entering 32-bit mode");
                overflow = true;
            }
        }
        let raw_offset = entries[entries.len() - 1];
        let (compressed, current_offset) = if overflow {
            (false, raw_offset)
        } else {
            (raw_offset & COMPRESSED_MASK != 0, raw_offset & OFFSET_MASK)
        };
        self.chunks.push(ChunkLocator {
            segment_file,
            file_offset: base_offset + current_offset as i64,
            size: 0,
            compressed,
        });

        Ok(())
    }

    /// Infers the size of the last located chunk from the section layout.
    ///
    /// The table gives no size for its last chunk; it ends where the
    /// section containing it ends.
    pub fn calculate_last_offset(
        &mut self,
        section_ranges: &[SectionRange],
        tolerance: ErrorTolerance,
    ) -> Result<()> {
        let last = self
            .chunks
            .last_mut()
            .ok_or_else(|| Error::invalid_argument("offset table is empty"))?;

        for range in section_ranges {
            if range.start_offset < last.file_offset && last.file_offset < range.end_offset {
                let chunk_size = range.end_offset - last.file_offset;

                if chunk_size == 0 {
                    tracing::warn!("last chunk has zero size");
                    if tolerance < ErrorTolerance::Compensate {
                        return Err(Error::invalid_data("invalid chunk size: size is zero"));
                    }
                }
                if chunk_size > i32::MAX as i64 {
                    return Err(Error::out_of_bounds("last chunk size exceeds maximum"));
                }
                last.size = chunk_size as u32;

                return Ok(());
            }
        }
        tracing::debug!(
            file_offset = last.file_offset,
            "no section range contains the last chunk offset"
        );
        Ok(())
    }

    /// Compares this table against its backup (table2).
    ///
    /// Only the chunk count and the file offsets are authoritative; sizes
    /// and compression flags are not compared.
    pub fn matches(&self, other: &OffsetTable) -> bool {
        if self.chunks.len() != other.chunks.len() {
            tracing::debug!(
                table = self.chunks.len(),
                table2 = other.chunks.len(),
                "offset tables differ in size"
            );
            return false;
        }
        for (index, (first, second)) in self.chunks.iter().zip(&other.chunks).enumerate() {
            if first.file_offset != second.file_offset {
                tracing::debug!(
                    chunk = index,
                    table = first.file_offset,
                    table2 = second.file_offset,
                    "offset tables differ in file offset"
                );
                return false;
            }
        }
        true
    }

    /// Produces the table entries for `count` locators starting at `index`,
    /// relative to `base_offset`. The write-side inverse of
    /// [`OffsetTable::fill`].
    pub fn fill_offsets(&self, index: usize, count: usize, base_offset: i64) -> Result<Vec<u32>> {
        if base_offset < 0 {
            return Err(Error::invalid_argument("negative table base offset"));
        }
        if index + count > self.chunks.len() {
            return Err(Error::invalid_argument(
                "chunk range escapes the offset table",
            ));
        }
        let mut entries = Vec::with_capacity(count);

        for locator in &self.chunks[index..index + count] {
            let offset = locator.file_offset - base_offset;

            if !(0..=i32::MAX as i64).contains(&offset) {
                return Err(Error::out_of_bounds(format!(
                    "chunk offset {offset} not representable in a table entry"
                )));
            }
            let mut entry = offset as u32;
            if locator.compressed {
                entry |= COMPRESSED_MASK;
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Positions the owning segment file at a chunk and returns the offset.
    /// The sole read-path entry point used by the chunk codec.
    pub fn seek(&self, chunk: usize, segments: &mut SegmentTable) -> Result<i64> {
        let locator = self.locator(chunk)?;
        segments.seek(locator.segment_file, locator.file_offset)?;
        Ok(locator.file_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENT: SegmentFileId = SegmentFileId(0);

    fn filled(base_offset: i64, entries: &[u32]) -> OffsetTable {
        let mut table = OffsetTable::new();
        table
            .fill(base_offset, entries, SEGMENT, ErrorTolerance::None)
            .unwrap();
        table
    }

    #[test]
    fn test_fill_produces_contiguous_locators() {
        let table = filled(0x1000, &[0x0000_1000, 0x0000_3000, 0x0000_5000]);

        assert_eq!(table.number_of_chunks(), 3);
        assert_eq!(
            *table.locator(0).unwrap(),
            ChunkLocator {
                segment_file: SEGMENT,
                file_offset: 0x2000,
                size: 0x2000,
                compressed: false,
            }
        );
        assert_eq!(
            *table.locator(1).unwrap(),
            ChunkLocator {
                segment_file: SEGMENT,
                file_offset: 0x4000,
                size: 0x2000,
                compressed: false,
            }
        );
        // Last chunk size pending until calculate_last_offset.
        assert_eq!(
            *table.locator(2).unwrap(),
            ChunkLocator {
                segment_file: SEGMENT,
                file_offset: 0x6000,
                size: 0,
                compressed: false,
            }
        );
    }

    #[test]
    fn test_fill_propagates_compressed_bit() {
        let table = filled(0, &[0x8000_1000, 0x0000_3000, 0x8000_5000]);

        assert!(table.locator(0).unwrap().compressed);
        assert_eq!(table.locator(0).unwrap().file_offset, 0x1000);
        assert!(!table.locator(1).unwrap().compressed);
        assert!(table.locator(2).unwrap().compressed);
    }

    #[test]
    fn test_fill_encase6_overflow_recovery() {
        // The second entry's masked offset runs backwards while its raw
        // value does not: the raw difference is the chunk size, and the
        // chunk end crossing 2 GiB flips the table into 32-bit mode.
        let table = filled(0, &[0x7fff_ff00, 0x8000_0100, 0x9000_0000]);

        assert_eq!(
            *table.locator(0).unwrap(),
            ChunkLocator {
                segment_file: SEGMENT,
                file_offset: 0x7fff_ff00,
                size: 0x200,
                compressed: false,
            }
        );
        // In overflow mode the whole raw value is the offset.
        assert_eq!(
            *table.locator(1).unwrap(),
            ChunkLocator {
                segment_file: SEGMENT,
                file_offset: 0x8000_0100,
                size: 0x0fff_ff00,
                compressed: false,
            }
        );
        assert_eq!(table.locator(2).unwrap().file_offset, 0x9000_0000);
    }

    #[test]
    fn test_fill_rejects_backwards_raw_offset() {
        let mut table = OffsetTable::new();
        assert!(table
            .fill(0, &[0x0000_3000, 0x0000_1000], SEGMENT, ErrorTolerance::None)
            .is_err());
    }

    #[test]
    fn test_fill_zero_size_tolerance() {
        let mut strict = OffsetTable::new();
        assert!(strict
            .fill(
                0,
                &[0x1000, 0x1000, 0x2000],
                SEGMENT,
                ErrorTolerance::None
            )
            .is_err());

        let mut lenient = OffsetTable::new();
        lenient
            .fill(
                0,
                &[0x1000, 0x1000, 0x2000],
                SEGMENT,
                ErrorTolerance::Compensate,
            )
            .unwrap();
        assert_eq!(lenient.locator(0).unwrap().size, 0);
    }

    #[test]
    fn test_fill_appends_across_sections() {
        let mut table = OffsetTable::new();
        table
            .fill(0, &[0x1000, 0x2000], SEGMENT, ErrorTolerance::None)
            .unwrap();
        table
            .fill(
                0x10000,
                &[0x1000, 0x2000],
                SegmentFileId(1),
                ErrorTolerance::None,
            )
            .unwrap();

        assert_eq!(table.number_of_chunks(), 4);
        assert_eq!(table.locator(2).unwrap().file_offset, 0x11000);
        assert_eq!(table.locator(2).unwrap().segment_file, SegmentFileId(1));
    }

    #[test]
    fn test_calculate_last_offset() {
        let mut table = filled(0x1000, &[0x0000_1000, 0x0000_3000, 0x0000_5000]);

        let sections = [
            SectionRange {
                start_offset: 0x0,
                end_offset: 0x1000,
            },
            SectionRange {
                start_offset: 0x1000,
                end_offset: 0x8000,
            },
        ];
        table
            .calculate_last_offset(&sections, ErrorTolerance::None)
            .unwrap();

        assert_eq!(table.locator(2).unwrap().size, 0x2000);
    }

    #[test]
    fn test_calculate_last_offset_without_covering_section() {
        let mut table = filled(0, &[0x1000, 0x2000]);
        table
            .calculate_last_offset(
                &[SectionRange {
                    start_offset: 0x4000,
                    end_offset: 0x5000,
                }],
                ErrorTolerance::None,
            )
            .unwrap();
        assert_eq!(table.locator(1).unwrap().size, 0);
    }

    #[test]
    fn test_table2_comparison() {
        let first = filled(0x1000, &[0x1000, 0x3000, 0x5000]);
        let mut second = filled(0x1000, &[0x1000, 0x3000, 0x5000]);

        assert!(first.matches(&second));

        second.chunks[1].file_offset += 1;
        assert!(!first.matches(&second));

        let shorter = filled(0x1000, &[0x1000, 0x3000]);
        assert!(!first.matches(&shorter));
    }

    #[test]
    fn test_table2_comparison_ignores_size_and_compression() {
        let first = filled(0, &[0x1000, 0x3000]);
        let mut second = filled(0, &[0x1000, 0x3000]);
        second.chunks[0].size = 99;
        second.chunks[0].compressed = true;

        assert!(first.matches(&second));
    }

    #[test]
    fn test_fill_offsets_roundtrip() {
        let mut table = OffsetTable::new();
        table.chunks = vec![
            ChunkLocator {
                segment_file: SEGMENT,
                file_offset: 0x2000,
                size: 0x1000,
                compressed: false,
            },
            ChunkLocator {
                segment_file: SEGMENT,
                file_offset: 0x3000,
                size: 0x1000,
                compressed: true,
            },
            ChunkLocator {
                segment_file: SEGMENT,
                file_offset: 0x4000,
                size: 0,
                compressed: false,
            },
        ];

        let entries = table.fill_offsets(0, 3, 0x1000).unwrap();
        assert_eq!(entries, vec![0x0000_1000, 0x8000_2000, 0x0000_3000]);

        let mut recovered = OffsetTable::new();
        recovered
            .fill(0x1000, &entries, SEGMENT, ErrorTolerance::None)
            .unwrap();

        assert_eq!(recovered.locator(0).unwrap(), table.locator(0).unwrap());
        assert_eq!(recovered.locator(1).unwrap(), table.locator(1).unwrap());
        assert_eq!(recovered.locator(2).unwrap().file_offset, 0x4000);
        assert_eq!(recovered.locator(2).unwrap().size, 0);
    }

    #[test]
    fn test_fill_offsets_rejects_out_of_range() {
        let table = filled(0x1000, &[0x1000, 0x2000]);
        assert!(table.fill_offsets(0, 2, 0x10_0000).is_err());
        assert!(table.fill_offsets(1, 2, 0).is_err());
    }

    #[test]
    fn test_table_section_parse() {
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&0x1000u64.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0x0000_1000u32.to_le_bytes());
        data.extend_from_slice(&0x8000_3000u32.to_le_bytes());
        data.extend_from_slice(&0x0000_5000u32.to_le_bytes());

        let section = TableSection::parse(&data, 16375).unwrap();
        assert_eq!(section.base_offset, 0x1000);
        assert_eq!(section.entries, vec![0x0000_1000, 0x8000_3000, 0x0000_5000]);
    }

    #[test]
    fn test_table_section_parse_rejects_bad_input() {
        assert!(TableSection::parse(&[0u8; 8], 16375).is_err());

        let mut data = Vec::new();
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 20]);
        data.extend_from_slice(&0x1000u32.to_le_bytes());
        // Declares two entries but carries one.
        assert!(TableSection::parse(&data, 16375).is_err());

        let mut oversized = Vec::new();
        oversized.extend_from_slice(&2u32.to_le_bytes());
        oversized.extend_from_slice(&[0u8; 20]);
        oversized.extend_from_slice(&0x1000u32.to_le_bytes());
        oversized.extend_from_slice(&0x2000u32.to_le_bytes());
        assert!(TableSection::parse(&oversized, 1).is_err());
    }
}
