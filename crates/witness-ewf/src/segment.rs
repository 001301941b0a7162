//! Segment file arena and extension naming
//!
//! A logical image is split across a numbered sequence of segment files.
//! The arena owns every open segment reader; chunk locators refer to
//! segments by index, so the arena always outlives the offset table built
//! over it.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use witness_core::{Error, Format, ReadSeek, Result, SegmentFileType};

/// Index of a segment file within a [`SegmentTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentFileId(pub usize);

/// Byte range `[start_offset, end_offset)` of one section within a segment file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange {
    pub start_offset: i64,
    pub end_offset: i64,
}

/// One open segment file with its discovered section layout
pub struct SegmentFile {
    reader: Box<dyn ReadSeek>,
    sections: Vec<SectionRange>,
    filename: Option<String>,
}

/// The arena of open segment files belonging to one logical image
#[derive(Default)]
pub struct SegmentTable {
    files: Vec<SegmentFile>,
}

impl SegmentTable {
    pub fn new() -> Self {
        SegmentTable::default()
    }

    /// Opens a segment file from disk and adds it to the arena
    pub fn open(&mut self, path: &Path) -> Result<SegmentFileId> {
        let file = File::open(path)?;
        let filename = path.to_str().map(str::to_string);
        Ok(self.insert_named(Box::new(file), filename))
    }

    /// Adds an already-open segment reader to the arena
    pub fn insert(&mut self, reader: Box<dyn ReadSeek>) -> SegmentFileId {
        self.insert_named(reader, None)
    }

    fn insert_named(&mut self, reader: Box<dyn ReadSeek>, filename: Option<String>) -> SegmentFileId {
        let id = SegmentFileId(self.files.len());
        self.files.push(SegmentFile {
            reader,
            sections: Vec::new(),
            filename,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn file(&self, id: SegmentFileId) -> Result<&SegmentFile> {
        self.files
            .get(id.0)
            .ok_or_else(|| Error::invalid_argument(format!("no segment file with index {}", id.0)))
    }

    fn file_mut(&mut self, id: SegmentFileId) -> Result<&mut SegmentFile> {
        self.files
            .get_mut(id.0)
            .ok_or_else(|| Error::invalid_argument(format!("no segment file with index {}", id.0)))
    }

    /// The filename a segment was opened from, if it came from disk
    pub fn filename(&self, id: SegmentFileId) -> Result<Option<&str>> {
        Ok(self.file(id)?.filename.as_deref())
    }

    /// The ordered section ranges covering the segment file
    pub fn section_ranges(&self, id: SegmentFileId) -> Result<&[SectionRange]> {
        Ok(&self.file(id)?.sections)
    }

    /// Records the section layout discovered while scanning a segment file
    pub fn set_section_ranges(&mut self, id: SegmentFileId, sections: Vec<SectionRange>) -> Result<()> {
        self.file_mut(id)?.sections = sections;
        Ok(())
    }

    /// Positions the segment reader at an absolute offset
    pub fn seek(&mut self, id: SegmentFileId, offset: i64) -> Result<i64> {
        if offset < 0 {
            return Err(Error::invalid_argument("negative segment file offset"));
        }
        let position = self.file_mut(id)?.reader.seek(SeekFrom::Start(offset as u64))?;
        Ok(position as i64)
    }

    /// Reads exactly `buffer.len()` bytes at the current position
    pub fn read_exact(&mut self, id: SegmentFileId, buffer: &mut [u8]) -> Result<()> {
        self.file_mut(id)?.reader.read_exact(buffer)?;
        Ok(())
    }
}

fn extension_characters(file_type: SegmentFileType, format: Format) -> (u8, u8) {
    match file_type {
        SegmentFileType::Ewf => {
            if matches!(format, Format::Ewf | Format::Ewfx) {
                (b'e', b'a')
            } else if format.is_smart() {
                (b's', b'a')
            } else {
                (b'E', b'A')
            }
        }
        SegmentFileType::Lwf => (b'L', b'A'),
        SegmentFileType::Dwf => (b'd', b'a'),
    }
}

/// The largest segment number the extension scheme can express for a type
pub fn maximum_number_of_segments(file_type: SegmentFileType, format: Format) -> u16 {
    let (first, _) = extension_characters(file_type, format);
    let last = if first.is_ascii_uppercase() { b'Z' } else { b'z' };
    // Prefix characters after the first each carry a full 26 x 26 block.
    ((last - first) as u16) * 26 * 26 + 99
}

/// Creates the three-character extension for a segment file.
///
/// Segments 1-99 use two decimal digits after the prefix character;
/// segment 100 onward counts in base 26 across positions 2-3, then
/// increments the prefix character. Exhausting the prefix range is a hard
/// error.
pub fn filename_extension(
    segment_number: u16,
    file_type: SegmentFileType,
    format: Format,
) -> Result<[u8; 3]> {
    if segment_number == 0 {
        return Err(Error::invalid_argument("segment number zero"));
    }
    if segment_number > maximum_number_of_segments(file_type, format) {
        return Err(Error::out_of_bounds(format!(
            "segment number {segment_number} exceeds the maximum number of segment files"
        )));
    }
    let (first_character, additional_character) = extension_characters(file_type, format);

    let mut extension = [first_character, 0, 0];

    if segment_number <= 99 {
        extension[1] = b'0' + (segment_number / 10) as u8;
        extension[2] = b'0' + (segment_number % 10) as u8;
    } else {
        let mut remainder = segment_number - 100;
        extension[2] = additional_character + (remainder % 26) as u8;
        remainder /= 26;
        extension[1] = additional_character + (remainder % 26) as u8;
        remainder /= 26;

        if remainder >= 26 {
            return Err(Error::out_of_bounds(
                "segment file extension scheme exhausted",
            ));
        }
        extension[0] = first_character + remainder as u8;
    }
    if extension[0] > b'z' || (extension[0] > b'Z' && extension[0] < b'a') {
        return Err(Error::out_of_bounds(
            "segment file extension scheme exhausted",
        ));
    }
    Ok(extension)
}

/// Creates a full segment filename: `basename.extension`
pub fn create_filename(
    basename: &str,
    segment_number: u16,
    file_type: SegmentFileType,
    format: Format,
) -> Result<String> {
    if basename.is_empty() {
        return Err(Error::invalid_argument("empty basename"));
    }
    let extension = filename_extension(segment_number, file_type, format)?;
    Ok(format!(
        "{}.{}{}{}",
        basename, extension[0] as char, extension[1] as char, extension[2] as char
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ext(segment_number: u16, file_type: SegmentFileType, format: Format) -> String {
        let extension = filename_extension(segment_number, file_type, format).unwrap();
        String::from_utf8(extension.to_vec()).unwrap()
    }

    #[test]
    fn test_extension_decimal_range() {
        assert_eq!(ext(1, SegmentFileType::Ewf, Format::Encase6), "E01");
        assert_eq!(ext(9, SegmentFileType::Ewf, Format::Encase6), "E09");
        assert_eq!(ext(42, SegmentFileType::Ewf, Format::Encase6), "E42");
        assert_eq!(ext(99, SegmentFileType::Ewf, Format::Encase6), "E99");
    }

    #[test]
    fn test_extension_alphabetic_range() {
        assert_eq!(ext(100, SegmentFileType::Ewf, Format::Encase6), "EAA");
        assert_eq!(ext(101, SegmentFileType::Ewf, Format::Encase6), "EAB");
        assert_eq!(ext(126, SegmentFileType::Ewf, Format::Encase6), "EBA");
        // 100 + 26 * 26 rolls the prefix character over to F.
        assert_eq!(ext(776, SegmentFileType::Ewf, Format::Encase6), "FAA");
    }

    #[test]
    fn test_extension_prefix_by_type_and_format() {
        assert_eq!(ext(1, SegmentFileType::Ewf, Format::Ewf), "e01");
        assert_eq!(ext(1, SegmentFileType::Ewf, Format::Ewfx), "e01");
        assert_eq!(ext(1, SegmentFileType::Ewf, Format::Smart), "s01");
        assert_eq!(ext(1, SegmentFileType::Lwf, Format::Lvf), "L01");
        assert_eq!(ext(1, SegmentFileType::Dwf, Format::Encase6), "d01");
    }

    #[test]
    fn test_extension_exhaustion() {
        assert!(filename_extension(0, SegmentFileType::Ewf, Format::Encase6).is_err());

        let maximum = maximum_number_of_segments(SegmentFileType::Ewf, Format::Encase6);
        assert!(filename_extension(maximum, SegmentFileType::Ewf, Format::Encase6).is_ok());
        assert!(filename_extension(maximum + 1, SegmentFileType::Ewf, Format::Encase6).is_err());
    }

    #[test]
    fn test_create_filename() {
        assert_eq!(
            create_filename("evidence", 2, SegmentFileType::Ewf, Format::Encase6).unwrap(),
            "evidence.E02"
        );
        assert!(create_filename("", 1, SegmentFileType::Ewf, Format::Encase6).is_err());
    }

    #[test]
    fn test_segment_table_arena() {
        let mut table = SegmentTable::new();
        assert!(table.is_empty());

        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("image.E01");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"0123456789abcdef")
            .unwrap();

        let id = table.open(&path).unwrap();
        assert_eq!(table.len(), 1);

        table
            .set_section_ranges(
                id,
                vec![SectionRange {
                    start_offset: 0,
                    end_offset: 16,
                }],
            )
            .unwrap();
        assert_eq!(table.section_ranges(id).unwrap().len(), 1);

        table.seek(id, 10).unwrap();
        let mut buffer = [0u8; 6];
        table.read_exact(id, &mut buffer).unwrap();
        assert_eq!(&buffer, b"abcdef");

        assert!(table.seek(SegmentFileId(7), 0).is_err());
        assert!(table.seek(id, -1).is_err());
    }
}
