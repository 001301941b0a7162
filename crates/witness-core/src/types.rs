//! Shared types and constants for the Expert Witness Format family

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The minimum chunk size: 64 sectors of 512 bytes
pub const MINIMUM_CHUNK_SIZE: u32 = 32768;

/// The maximum number of table entries per table section (EWF up to EnCase 5)
pub const MAXIMUM_TABLE_ENTRIES: u32 = 16375;

/// The maximum number of table entries per table section as of EnCase 6
pub const MAXIMUM_TABLE_ENTRIES_ENCASE6: u32 = 65534;

/// EWF on-disk format variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    /// Original EWF (EnCase 1 era, lower-case extensions)
    Ewf,
    /// EWF extended (libewf's own format with xheader/xhash)
    Ewfx,
    /// EnCase 1
    Encase1,
    /// EnCase 2
    Encase2,
    /// EnCase 3
    Encase3,
    /// EnCase 4
    Encase4,
    /// EnCase 5
    Encase5,
    /// EnCase 6
    Encase6,
    /// EnCase 5 Linux acquisition (linen)
    Linen5,
    /// EnCase 6 Linux acquisition (linen)
    Linen6,
    /// SMART (EWF-S01, `.s01` extensions)
    Smart,
    /// FTK Imager
    Ftk,
    /// Logical Volume File (L01)
    Lvf,
}

impl Format {
    /// True for the EWF-S01 dialect, which always compresses chunks and
    /// stores checksums differently
    pub fn is_smart(&self) -> bool {
        matches!(self, Format::Smart)
    }

    /// Maximum number of entries a single on-disk table section may carry
    pub fn maximum_table_entries(&self) -> u32 {
        match self {
            Format::Encase6 | Format::Linen6 => MAXIMUM_TABLE_ENTRIES_ENCASE6,
            _ => MAXIMUM_TABLE_ENTRIES,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Ewf => "EWF",
            Format::Ewfx => "EWFX",
            Format::Encase1 => "EnCase 1",
            Format::Encase2 => "EnCase 2",
            Format::Encase3 => "EnCase 3",
            Format::Encase4 => "EnCase 4",
            Format::Encase5 => "EnCase 5",
            Format::Encase6 => "EnCase 6",
            Format::Linen5 => "linen 5",
            Format::Linen6 => "linen 6",
            Format::Smart => "SMART",
            Format::Ftk => "FTK Imager",
            Format::Lvf => "LVF",
        };
        write!(f, "{}", name)
    }
}

/// Chunk compression level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionLevel {
    /// No compression (chunks carry an Adler-32 trailer instead)
    None,
    /// zlib best speed
    Fast,
    /// zlib best compression
    Best,
    /// Alias for Fast
    Default,
}

impl CompressionLevel {
    /// The wire code used in configuration interfaces
    pub fn code(&self) -> i8 {
        match self {
            CompressionLevel::None => 0,
            CompressionLevel::Fast => 1,
            CompressionLevel::Best => 2,
            CompressionLevel::Default => -1,
        }
    }

    /// Decode a wire code
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(CompressionLevel::None),
            1 => Some(CompressionLevel::Fast),
            2 => Some(CompressionLevel::Best),
            -1 => Some(CompressionLevel::Default),
            _ => None,
        }
    }

    /// The zlib compression level this maps to
    pub fn zlib_level(&self) -> u32 {
        match self {
            CompressionLevel::None => 0,
            CompressionLevel::Fast | CompressionLevel::Default => 1,
            CompressionLevel::Best => 9,
        }
    }

    /// The textual value stored in the header `r` field
    pub fn header_value(&self) -> &'static str {
        match self {
            CompressionLevel::None => "n",
            CompressionLevel::Fast | CompressionLevel::Default => "f",
            CompressionLevel::Best => "b",
        }
    }
}

/// Output format for converted date strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    /// `DoW Mon DD hh:mm:ss YYYY`
    Ctime,
    /// `DD/MM/YYYY hh:mm:ss`
    DayMonth,
    /// `MM/DD/YYYY hh:mm:ss`
    MonthDay,
    /// `YYYY-MM-DDThh:mm:ss`
    Iso8601,
}

/// Media type stored in the volume section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    /// Removable media (floppy, USB, etc.)
    Removable,
    /// Fixed disk
    Fixed,
    /// Optical media (CD, DVD)
    Optical,
    /// Logical evidence (single files)
    SingleFiles,
    /// Physical memory
    Memory,
    /// Unknown media type
    Unknown(u8),
}

impl From<u8> for MediaType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Removable,
            0x01 => Self::Fixed,
            0x03 => Self::Optical,
            0x0e => Self::SingleFiles,
            0x10 => Self::Memory,
            v => Self::Unknown(v),
        }
    }
}

impl MediaType {
    /// The wire byte stored in the volume section
    pub fn code(&self) -> u8 {
        match self {
            Self::Removable => 0x00,
            Self::Fixed => 0x01,
            Self::Optical => 0x03,
            Self::SingleFiles => 0x0e,
            Self::Memory => 0x10,
            Self::Unknown(v) => *v,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removable => write!(f, "Removable"),
            Self::Fixed => write!(f, "Fixed Disk"),
            Self::Optical => write!(f, "Optical"),
            Self::SingleFiles => write!(f, "Single Files"),
            Self::Memory => write!(f, "Memory"),
            Self::Unknown(v) => write!(f, "Unknown (0x{:02X})", v),
        }
    }
}

/// Media flag bits stored in the volume section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaFlags(pub u8);

impl MediaFlags {
    /// The acquired media is a physical device rather than a logical volume
    pub const PHYSICAL: u8 = 0x02;
    /// Acquisition used a Fastbloc write blocker
    pub const FASTBLOC: u8 = 0x04;
    /// Acquisition used a Tableau write blocker
    pub const TABLEAU: u8 = 0x08;

    /// True if the physical-device bit is set
    pub fn is_physical(&self) -> bool {
        self.0 & Self::PHYSICAL != 0
    }

    /// The volume type implied by the physical bit
    pub fn volume_type(&self) -> VolumeType {
        if self.is_physical() {
            VolumeType::Physical
        } else {
            VolumeType::Logical
        }
    }
}

/// Volume type derived from the media flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeType {
    /// Logical volume
    Logical,
    /// Physical device
    Physical,
}

/// Segment file type, determines the extension prefix character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentFileType {
    /// Regular evidence file (`.E01` / `.e01` / `.s01`)
    Ewf,
    /// Logical evidence file (`.L01`)
    Lwf,
    /// Delta (write cache) file (`.d01`)
    Dwf,
}

/// Codepage used to decode the narrow header section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderCodepage {
    /// Plain ASCII
    Ascii,
    /// Windows Central European
    Windows1250,
    /// Windows Cyrillic
    Windows1251,
    /// Windows Western European
    Windows1252,
    /// Windows Greek
    Windows1253,
    /// Windows Turkish
    Windows1254,
    /// Windows Arabic
    Windows1256,
    /// Windows Baltic
    Windows1257,
}

impl HeaderCodepage {
    /// The encoding to decode header bytes with; `None` means plain ASCII
    pub fn encoding(&self) -> Option<&'static Encoding> {
        match self {
            HeaderCodepage::Ascii => None,
            HeaderCodepage::Windows1250 => Some(encoding_rs::WINDOWS_1250),
            HeaderCodepage::Windows1251 => Some(encoding_rs::WINDOWS_1251),
            HeaderCodepage::Windows1252 => Some(encoding_rs::WINDOWS_1252),
            HeaderCodepage::Windows1253 => Some(encoding_rs::WINDOWS_1253),
            HeaderCodepage::Windows1254 => Some(encoding_rs::WINDOWS_1254),
            HeaderCodepage::Windows1256 => Some(encoding_rs::WINDOWS_1256),
            HeaderCodepage::Windows1257 => Some(encoding_rs::WINDOWS_1257),
        }
    }
}

/// How tolerant table reconstruction is of recoverable defects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorTolerance {
    /// Fail on any defect
    None,
    /// Compensate for defects that have a usable interpretation
    Compensate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_level_zlib_mapping() {
        assert_eq!(CompressionLevel::None.zlib_level(), 0);
        assert_eq!(CompressionLevel::Fast.zlib_level(), 1);
        assert_eq!(CompressionLevel::Default.zlib_level(), 1);
        assert_eq!(CompressionLevel::Best.zlib_level(), 9);
    }

    #[test]
    fn test_compression_level_codes() {
        for level in [
            CompressionLevel::None,
            CompressionLevel::Fast,
            CompressionLevel::Best,
            CompressionLevel::Default,
        ] {
            assert_eq!(CompressionLevel::from_code(level.code()), Some(level));
        }
        assert_eq!(CompressionLevel::from_code(3), None);
    }

    #[test]
    fn test_media_type_roundtrip() {
        for code in [0x00u8, 0x01, 0x03, 0x0e, 0x10, 0x7f] {
            assert_eq!(MediaType::from(code).code(), code);
        }
    }

    #[test]
    fn test_media_flags_volume_type() {
        assert_eq!(MediaFlags(0).volume_type(), VolumeType::Logical);
        assert_eq!(
            MediaFlags(MediaFlags::PHYSICAL).volume_type(),
            VolumeType::Physical
        );
    }

    #[test]
    fn test_format_table_entry_limits() {
        assert_eq!(Format::Encase5.maximum_table_entries(), 16375);
        assert_eq!(Format::Encase6.maximum_table_entries(), 65534);
        assert_eq!(Format::Linen6.maximum_table_entries(), 65534);
    }

    #[test]
    fn test_codepage_encodings() {
        assert!(HeaderCodepage::Ascii.encoding().is_none());
        assert_eq!(
            HeaderCodepage::Windows1251.encoding().unwrap().name(),
            "windows-1251"
        );
    }
}
