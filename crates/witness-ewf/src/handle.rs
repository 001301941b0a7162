//! The handle façade exposed to applications
//!
//! A handle owns the segment file arena, the offset table built over it,
//! the media description and the metadata value tables. The read path
//! composes them: locator lookup, segment seek and read, then chunk
//! unpack. The write half stages chunks through the same codec.

use crate::chunk::{is_empty_block, ChunkData, PackFlags};
use crate::compress::compress;
use crate::segment::{SectionRange, SegmentFileId, SegmentTable};
use crate::table::{OffsetTable, TableSection};
use crate::values::{hash, header, ValueTable};
use witness_core::{
    CompressionLevel, DateFormat, Error, ErrorTolerance, Format, HeaderCodepage, MediaFlags,
    MediaType, ReadSeek, Result, VolumeType,
};

/// A run of sectors, used for acquiry errors, checksum errors and sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRange {
    pub first_sector: u64,
    pub number_of_sectors: u64,
}

/// The media description stored in the volume section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaValues {
    pub sectors_per_chunk: u32,
    pub bytes_per_sector: u32,
    pub number_of_sectors: u64,
    pub error_granularity: u32,
    pub media_type: MediaType,
    pub media_flags: MediaFlags,
}

impl Default for MediaValues {
    fn default() -> Self {
        MediaValues {
            sectors_per_chunk: 64,
            bytes_per_sector: 512,
            number_of_sectors: 0,
            error_granularity: 0,
            media_type: MediaType::Fixed,
            media_flags: MediaFlags::default(),
        }
    }
}

impl MediaValues {
    /// Chunk size in bytes
    pub fn chunk_size(&self) -> u32 {
        self.sectors_per_chunk * self.bytes_per_sector
    }

    /// Total media size in bytes
    pub fn media_size(&self) -> u64 {
        self.number_of_sectors * self.bytes_per_sector as u64
    }
}

/// Raw metadata section payloads collected while scanning segment files
#[derive(Debug, Clone, Default)]
struct HeaderSections {
    header: Option<Vec<u8>>,
    header2: Option<Vec<u8>>,
    xheader: Option<Vec<u8>>,
    xhash: Option<Vec<u8>>,
    md5_hash: Option<[u8; 16]>,
    sha1_hash: Option<[u8; 20]>,
}

/// Read and write access to one logical EWF image
pub struct Handle {
    segments: SegmentTable,
    offset_table: OffsetTable,
    backup_table: OffsetTable,
    media: MediaValues,
    format: Format,
    guid: [u8; 16],
    compression_level: CompressionLevel,
    compression_flags: PackFlags,
    header_codepage: HeaderCodepage,
    error_tolerance: ErrorTolerance,
    wipe_chunk_on_error: bool,
    sections: HeaderSections,
    header_values: Option<ValueTable>,
    hash_values: ValueTable,
    acquiry_errors: Vec<SectorRange>,
    checksum_errors: Vec<SectorRange>,
    sessions: Vec<SectorRange>,
    segment_filename: Option<String>,
    delta_segment_filename: Option<String>,
    compressed_zero_block: Option<Vec<u8>>,
    write_chunk_count: u64,
    values_initialized: bool,
}

impl Default for Handle {
    fn default() -> Self {
        Handle::new()
    }
}

impl Handle {
    pub fn new() -> Self {
        Handle {
            segments: SegmentTable::new(),
            offset_table: OffsetTable::new(),
            backup_table: OffsetTable::new(),
            media: MediaValues::default(),
            format: Format::Encase6,
            guid: [0u8; 16],
            compression_level: CompressionLevel::None,
            compression_flags: PackFlags::default(),
            header_codepage: HeaderCodepage::Ascii,
            error_tolerance: ErrorTolerance::Compensate,
            wipe_chunk_on_error: false,
            sections: HeaderSections::default(),
            header_values: None,
            hash_values: ValueTable::hash_values(),
            acquiry_errors: Vec::new(),
            checksum_errors: Vec::new(),
            sessions: Vec::new(),
            segment_filename: None,
            delta_segment_filename: None,
            compressed_zero_block: None,
            write_chunk_count: 0,
            values_initialized: false,
        }
    }

    fn require_values_not_initialized(&self, what: &str) -> Result<()> {
        if self.values_initialized {
            return Err(Error::value_already_set(format!(
                "{what} cannot change once chunks have been staged"
            )));
        }
        Ok(())
    }

    // ----- segment files and tables -------------------------------------

    /// Adds a segment file reader with its discovered section layout
    pub fn add_segment(
        &mut self,
        reader: Box<dyn ReadSeek>,
        sections: Vec<SectionRange>,
    ) -> Result<SegmentFileId> {
        let id = self.segments.insert(reader);
        self.segments.set_section_ranges(id, sections)?;
        Ok(id)
    }

    /// Appends decoded table entries for a segment to the offset table and
    /// infers the last chunk size from the segment's section layout
    pub fn append_table(
        &mut self,
        segment: SegmentFileId,
        base_offset: i64,
        entries: &[u32],
    ) -> Result<()> {
        self.offset_table
            .fill(base_offset, entries, segment, self.error_tolerance)?;
        let ranges = self.segments.section_ranges(segment)?.to_vec();
        self.offset_table
            .calculate_last_offset(&ranges, self.error_tolerance)
    }

    /// Parses a table section payload and appends its entries
    pub fn read_table_section(&mut self, segment: SegmentFileId, data: &[u8]) -> Result<()> {
        let section = TableSection::parse(data, self.format.maximum_table_entries())?;
        self.append_table(segment, section.base_offset, &section.entries)
    }

    /// Parses a table2 section payload into the backup table
    pub fn read_backup_table_section(&mut self, segment: SegmentFileId, data: &[u8]) -> Result<()> {
        let section = TableSection::parse(data, self.format.maximum_table_entries())?;
        self.backup_table
            .fill(section.base_offset, &section.entries, segment, self.error_tolerance)?;
        let ranges = self.segments.section_ranges(segment)?.to_vec();
        self.backup_table
            .calculate_last_offset(&ranges, self.error_tolerance)
    }

    /// Checks the primary table against its backup. A mismatch is logged
    /// and reported, never fatal.
    pub fn verify_offset_tables(&self) -> bool {
        if self.backup_table.is_empty() {
            return true;
        }
        let matches = self.offset_table.matches(&self.backup_table);
        if !matches {
            tracing::warn!("table and table2 sections disagree");
        }
        matches
    }

    pub fn number_of_chunks(&self) -> usize {
        self.offset_table.number_of_chunks()
    }

    // ----- read path ----------------------------------------------------

    /// Reads and unpacks one chunk.
    ///
    /// A failed checksum or corrupt compressed stream surfaces through the
    /// chunk's corruption flag and the checksum error list; the read still
    /// succeeds. With wipe-on-error enabled a corrupt chunk comes back
    /// zero-filled.
    pub fn read_chunk(&mut self, chunk: usize) -> Result<ChunkData> {
        let locator = *self.offset_table.locator(chunk)?;

        if locator.size == 0 {
            return Err(Error::invalid_data(format!(
                "chunk {chunk} has no usable size in the offset table"
            )));
        }
        self.offset_table.seek(chunk, &mut self.segments)?;

        let mut data = vec![0u8; locator.size as usize];
        self.segments.read_exact(locator.segment_file, &mut data)?;

        let mut chunk_data = ChunkData::from_packed(data, locator.compressed);
        chunk_data.unpack(self.media.chunk_size())?;

        if chunk_data.is_corrupt() {
            let first_sector = chunk as u64 * self.media.sectors_per_chunk as u64;
            self.add_checksum_error(first_sector, self.media.sectors_per_chunk as u64);

            if self.wipe_chunk_on_error {
                chunk_data.wipe(self.media.chunk_size());
            }
        }
        Ok(chunk_data)
    }

    // ----- write path ---------------------------------------------------

    /// Packs a chunk staged for write with the handle's compression
    /// settings. The first staged chunk freezes the media description.
    ///
    /// Full all-zero chunks are compressed once and the result cached, so
    /// zero-filled regions of the media pack without running zlib again.
    pub fn prepare_write_chunk(&mut self, chunk_data: &mut ChunkData) -> Result<()> {
        let chunk_size = self.media.chunk_size();

        if self.compressed_zero_block.is_none()
            && self.compression_flags.compress_empty_block
            && chunk_data.data_size() == chunk_size as usize
            && !chunk_data.is_packed()
            && is_empty_block(chunk_data.data())
            && chunk_data.data()[0] == 0
        {
            let mut zero_block = Vec::with_capacity(2 * chunk_size as usize);
            compress(&mut zero_block, chunk_data.data(), CompressionLevel::Default)?;
            self.compressed_zero_block = Some(zero_block);
        }
        chunk_data.pack(
            self.compression_level,
            self.compression_flags,
            self.format,
            chunk_size,
            self.compressed_zero_block.as_deref(),
        )?;
        self.write_chunk_count += 1;
        self.values_initialized = true;
        Ok(())
    }

    pub fn write_number_of_chunks(&self) -> u64 {
        self.write_chunk_count
    }

    // ----- media values -------------------------------------------------

    pub fn media_values(&self) -> &MediaValues {
        &self.media
    }

    pub fn sectors_per_chunk(&self) -> u32 {
        self.media.sectors_per_chunk
    }

    pub fn bytes_per_sector(&self) -> u32 {
        self.media.bytes_per_sector
    }

    pub fn number_of_sectors(&self) -> u64 {
        self.media.number_of_sectors
    }

    pub fn chunk_size(&self) -> u32 {
        self.media.chunk_size()
    }

    pub fn error_granularity(&self) -> u32 {
        self.media.error_granularity
    }

    pub fn media_size(&self) -> u64 {
        self.media.media_size()
    }

    pub fn media_type(&self) -> MediaType {
        self.media.media_type
    }

    pub fn media_flags(&self) -> MediaFlags {
        self.media.media_flags
    }

    pub fn volume_type(&self) -> VolumeType {
        self.media.media_flags.volume_type()
    }

    pub fn set_media_values(&mut self, media: MediaValues) -> Result<()> {
        self.require_values_not_initialized("media values")?;
        if media.sectors_per_chunk == 0 || media.bytes_per_sector == 0 {
            return Err(Error::invalid_argument("zero-sized media geometry"));
        }
        self.media = media;
        Ok(())
    }

    pub fn set_volume_type(&mut self, volume_type: VolumeType) -> Result<()> {
        self.require_values_not_initialized("volume type")?;
        match volume_type {
            VolumeType::Physical => self.media.media_flags.0 |= MediaFlags::PHYSICAL,
            VolumeType::Logical => self.media.media_flags.0 &= !MediaFlags::PHYSICAL,
        }
        Ok(())
    }

    // ----- format, guid, compression, codepage --------------------------

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn set_format(&mut self, format: Format) -> Result<()> {
        self.require_values_not_initialized("format")?;
        self.format = format;
        Ok(())
    }

    pub fn guid(&self) -> &[u8; 16] {
        &self.guid
    }

    pub fn set_guid(&mut self, guid: [u8; 16]) -> Result<()> {
        self.require_values_not_initialized("GUID")?;
        self.guid = guid;
        Ok(())
    }

    pub fn compression_values(&self) -> (CompressionLevel, PackFlags) {
        (self.compression_level, self.compression_flags)
    }

    pub fn set_compression_values(&mut self, level: CompressionLevel, flags: PackFlags) {
        self.compression_level = level;
        self.compression_flags = flags;
    }

    pub fn header_codepage(&self) -> HeaderCodepage {
        self.header_codepage
    }

    pub fn set_header_codepage(&mut self, codepage: HeaderCodepage) {
        self.header_codepage = codepage;
    }

    pub fn error_tolerance(&self) -> ErrorTolerance {
        self.error_tolerance
    }

    pub fn set_error_tolerance(&mut self, tolerance: ErrorTolerance) {
        self.error_tolerance = tolerance;
    }

    pub fn set_wipe_chunk_on_error(&mut self, wipe: bool) {
        self.wipe_chunk_on_error = wipe;
    }

    // ----- segment filenames --------------------------------------------

    pub fn segment_filename(&self) -> Option<&str> {
        self.segment_filename.as_deref()
    }

    pub fn set_segment_filename(&mut self, filename: impl Into<String>) {
        self.segment_filename = Some(filename.into());
    }

    pub fn delta_segment_filename(&self) -> Option<&str> {
        self.delta_segment_filename.as_deref()
    }

    pub fn set_delta_segment_filename(&mut self, filename: impl Into<String>) {
        self.delta_segment_filename = Some(filename.into());
    }

    // ----- acquiry errors, checksum errors, sessions --------------------

    pub fn number_of_acquiry_errors(&self) -> usize {
        self.acquiry_errors.len()
    }

    pub fn acquiry_error(&self, index: usize) -> Result<SectorRange> {
        self.acquiry_errors
            .get(index)
            .copied()
            .ok_or_else(|| Error::invalid_argument(format!("no acquiry error with index {index}")))
    }

    pub fn add_acquiry_error(&mut self, first_sector: u64, number_of_sectors: u64) {
        self.acquiry_errors.push(SectorRange {
            first_sector,
            number_of_sectors,
        });
    }

    pub fn number_of_checksum_errors(&self) -> usize {
        self.checksum_errors.len()
    }

    pub fn checksum_error(&self, index: usize) -> Result<SectorRange> {
        self.checksum_errors
            .get(index)
            .copied()
            .ok_or_else(|| Error::invalid_argument(format!("no checksum error with index {index}")))
    }

    pub fn add_checksum_error(&mut self, first_sector: u64, number_of_sectors: u64) {
        self.checksum_errors.push(SectorRange {
            first_sector,
            number_of_sectors,
        });
    }

    pub fn number_of_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, index: usize) -> Result<SectorRange> {
        self.sessions
            .get(index)
            .copied()
            .ok_or_else(|| Error::invalid_argument(format!("no session with index {index}")))
    }

    pub fn add_session(&mut self, first_sector: u64, number_of_sectors: u64) {
        self.sessions.push(SectorRange {
            first_sector,
            number_of_sectors,
        });
    }

    // ----- metadata sections --------------------------------------------

    pub fn set_header_section(&mut self, data: Vec<u8>) {
        self.sections.header = Some(data);
    }

    pub fn set_header2_section(&mut self, data: Vec<u8>) {
        self.sections.header2 = Some(data);
    }

    pub fn set_xheader_section(&mut self, data: Vec<u8>) {
        self.sections.xheader = Some(data);
    }

    pub fn set_xhash_section(&mut self, data: Vec<u8>) {
        self.sections.xhash = Some(data);
    }

    pub fn set_md5_hash_section(&mut self, digest: [u8; 16]) {
        self.sections.md5_hash = Some(digest);
    }

    pub fn set_sha1_hash_section(&mut self, digest: [u8; 20]) {
        self.sections.sha1_hash = Some(digest);
    }

    /// Parses whichever metadata section generation the image carries,
    /// preferring header2 over xheader over header
    pub fn parse_header_values(&mut self, date_format: DateFormat) -> Result<usize> {
        let parsed = if let Some(data) = &self.sections.header2 {
            header::parse_header2(data, date_format)?
        } else if let Some(data) = &self.sections.xheader {
            header::parse_xheader(data, date_format)?
        } else if let Some(data) = &self.sections.header {
            header::parse_header(data, self.header_codepage, date_format)?
        } else {
            return Err(Error::invalid_data("image carries no header section"));
        };
        let count = parsed.len();
        self.header_values = Some(parsed);
        Ok(count)
    }

    /// Parses the hash sections into the hash values. Binary sections are
    /// applied first so an xhash section can refine them.
    pub fn parse_hash_values(&mut self) -> Result<usize> {
        if let Some(digest) = self.sections.md5_hash {
            hash::parse_md5(&mut self.hash_values, &digest)?;
        }
        if let Some(digest) = self.sections.sha1_hash {
            hash::parse_sha1(&mut self.hash_values, &digest)?;
        }
        if let Some(data) = self.sections.xhash.clone() {
            let parsed = hash::parse_xhash(&data)?;
            for (identifier, value) in parsed.iter_set() {
                self.hash_values.set(identifier, value)?;
            }
        }
        Ok(self.hash_values.len())
    }

    // ----- header values ------------------------------------------------

    pub fn number_of_header_values(&self) -> usize {
        self.header_values.as_ref().map_or(0, ValueTable::len)
    }

    pub fn header_value_identifier(&self, index: usize) -> Option<&[u8]> {
        self.header_values
            .as_ref()
            .and_then(|values| values.identifier_at(index))
    }

    pub fn header_value(&self, identifier: &[u8]) -> Option<&[u8]> {
        self.header_values
            .as_ref()
            .and_then(|values| values.get(identifier))
    }

    pub fn set_header_value(&mut self, identifier: &[u8], value: &[u8]) -> Result<()> {
        self.header_values
            .get_or_insert_with(ValueTable::header_values)
            .set(identifier, value)
    }

    /// Copies the header values from another handle, skipping the dates
    /// (they describe the other acquisition) and empty values
    pub fn copy_header_values(&mut self, source: &Handle) -> Result<()> {
        let Some(source_values) = &source.header_values else {
            return Err(Error::invalid_argument("source handle has no header values"));
        };
        let destination = self
            .header_values
            .get_or_insert_with(ValueTable::header_values);

        for (identifier, value) in source_values.iter_set() {
            if identifier == b"acquiry_date" || identifier == b"system_date" {
                continue;
            }
            if value.is_empty() {
                continue;
            }
            destination.set(identifier, value)?;
        }
        Ok(())
    }

    /// Copies the media description from another handle
    pub fn copy_media_values(&mut self, source: &Handle) -> Result<()> {
        self.require_values_not_initialized("media values")?;
        self.media = source.media;
        Ok(())
    }

    // ----- hash values --------------------------------------------------

    pub fn number_of_hash_values(&self) -> usize {
        self.hash_values.len()
    }

    pub fn hash_value_identifier(&self, index: usize) -> Option<&[u8]> {
        self.hash_values.identifier_at(index)
    }

    pub fn hash_value(&self, identifier: &[u8]) -> Option<&[u8]> {
        self.hash_values.get(identifier)
    }

    pub fn set_hash_value(&mut self, identifier: &[u8], value: &[u8]) -> Result<()> {
        self.hash_values.set(identifier, value)
    }

    /// The MD5 hash as binary digest, if set
    pub fn md5_hash(&self) -> Result<Option<[u8; 16]>> {
        hash::generate_md5(&self.hash_values)
    }

    pub fn set_md5_hash(&mut self, digest: [u8; 16]) -> Result<()> {
        hash::parse_md5(&mut self.hash_values, &digest)
    }

    // ----- section generation -------------------------------------------

    /// Generates the header section for the handle's format
    pub fn generate_header_section(&self, timestamp: i64) -> Result<Vec<u8>> {
        let values = self
            .header_values
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("handle has no header values"))?;
        header::generate_header(values, self.format, timestamp, self.compression_level)
    }

    /// Generates the header2 section for the handle's format
    pub fn generate_header2_section(&self, timestamp: i64) -> Result<Vec<u8>> {
        let values = self
            .header_values
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("handle has no header values"))?;
        header::generate_header2(values, self.format, timestamp)
    }

    /// Generates the xheader section
    pub fn generate_xheader_section(&self, timestamp: i64) -> Result<Vec<u8>> {
        let values = self
            .header_values
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("handle has no header values"))?;
        header::generate_xheader(values, timestamp)
    }

    /// Generates the xhash section
    pub fn generate_xhash_section(&self) -> Vec<u8> {
        hash::generate_xhash(&self.hash_values)
    }
}
