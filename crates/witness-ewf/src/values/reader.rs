//! Streaming field reader for logical evidence file entry lines
//!
//! An entry line is a sequence of tab-delimited fields, either single-byte
//! UTF-8 or UTF-16 little-endian where the delimiter is the two-byte pair
//! `\t\0`. The reader is single-pass: the caller issues one read per
//! expected field and checks afterwards that the line was fully consumed.

use crate::values::string::SerializedString;
use witness_core::{Error, Result};

/// Character width of the entry line being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDataType {
    Utf8,
    Utf16le,
}

/// Cursor over one tab-delimited entry line
pub struct ValueReader<'a> {
    buffer: &'a [u8],
    buffer_offset: usize,
    line_offset: i64,
    value_index: usize,
    data_type: ValueDataType,
    value_data: Vec<u8>,
}

impl<'a> ValueReader<'a> {
    /// Creates a reader over one line. `line_offset` is the line's byte
    /// offset within the enclosing section, kept for diagnostics.
    pub fn new(buffer: &'a [u8], line_offset: i64, data_type: ValueDataType) -> Self {
        ValueReader {
            buffer,
            buffer_offset: 0,
            line_offset,
            value_index: 0,
            data_type,
            value_data: Vec::new(),
        }
    }

    /// Index of the next field to read
    pub fn value_index(&self) -> usize {
        self.value_index
    }

    /// Current byte offset within the line buffer
    pub fn buffer_offset(&self) -> usize {
        self.buffer_offset
    }

    /// Byte offset of the cursor within the enclosing section
    pub fn line_offset(&self) -> i64 {
        self.line_offset
    }

    /// True once every byte of the line has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.buffer_offset == self.buffer.len()
    }

    /// Advances to the next delimiter and returns the field bytes.
    ///
    /// The delimiter is consumed but not returned. Reading past the end of
    /// the buffer yields an empty field.
    pub fn read_data(&mut self) -> &'a [u8] {
        if self.buffer_offset >= self.buffer.len() {
            return &[];
        }
        let start = self.buffer_offset;
        let mut end = start;
        let mut read_size = 0;

        match self.data_type {
            ValueDataType::Utf8 => {
                while end < self.buffer.len() {
                    if self.buffer[end] == b'\t' {
                        read_size = (end + 1) - start;
                        self.value_index += 1;
                        break;
                    }
                    end += 1;
                }
            }
            ValueDataType::Utf16le => {
                while end + 1 < self.buffer.len() {
                    if self.buffer[end] == b'\t' && self.buffer[end + 1] == 0 {
                        read_size = (end + 2) - start;
                        self.value_index += 1;
                        break;
                    }
                    end += 2;
                }
                if read_size == 0 {
                    end = self.buffer.len();
                }
            }
        }
        if read_size == 0 {
            read_size = end - start;
        }
        self.line_offset += read_size as i64;
        self.buffer_offset += read_size;

        &self.buffer[start..end]
    }

    /// Narrows a field to single bytes, stripping the UTF-16 high bytes.
    /// Fails if any high byte is nonzero, which would mean the field is
    /// not the ASCII subset the numeric and base-16 fields are limited to.
    fn narrow_field(field: &[u8], data_type: ValueDataType) -> Result<Vec<u8>> {
        match data_type {
            ValueDataType::Utf8 => Ok(field.to_vec()),
            ValueDataType::Utf16le => {
                if field.len() % 2 != 0 {
                    return Err(Error::invalid_data("truncated UTF-16 field"));
                }
                field
                    .chunks_exact(2)
                    .map(|pair| {
                        if pair[1] != 0 {
                            Err(Error::invalid_data("non-ASCII character in narrow field"))
                        } else {
                            Ok(pair[0])
                        }
                    })
                    .collect()
            }
        }
    }

    /// Reads a signed decimal integer field; an empty field is zero
    pub fn read_integer_signed(&mut self) -> Result<i64> {
        let data_type = self.data_type;
        let field = self.read_data();
        let narrow = Self::narrow_field(field, data_type)?;

        if narrow.is_empty() {
            return Ok(0);
        }
        let text = std::str::from_utf8(&narrow)
            .map_err(|_| Error::invalid_data("integer field is not valid text"))?;
        let text = text.strip_prefix('+').unwrap_or(text);

        text.parse::<i64>()
            .map_err(|_| Error::invalid_data(format!("invalid signed integer value: {text:?}")))
    }

    /// Reads an unsigned decimal integer field; an empty field is zero
    pub fn read_integer_unsigned(&mut self) -> Result<u64> {
        let data_type = self.data_type;
        let field = self.read_data();
        let narrow = Self::narrow_field(field, data_type)?;

        if narrow.is_empty() {
            return Ok(0);
        }
        let text = std::str::from_utf8(&narrow)
            .map_err(|_| Error::invalid_data("integer field is not valid text"))?;

        text.parse::<u64>()
            .map_err(|_| Error::invalid_data(format!("invalid unsigned integer value: {text:?}")))
    }

    /// Reads a base-16 encoded field into the reusable scratch buffer and
    /// returns the decoded bytes
    pub fn read_byte_stream_base16(&mut self) -> Result<&[u8]> {
        let data_type = self.data_type;
        let field = self.read_data();
        let narrow = Self::narrow_field(field, data_type)?;

        self.value_data = hex::decode(&narrow)
            .map_err(|_| Error::invalid_data("invalid base-16 encoded field"))?;

        Ok(&self.value_data)
    }

    /// Reads a field into a serialized string
    pub fn read_serialized_string(&mut self) -> Result<SerializedString> {
        let data_type = self.data_type;
        let field = self.read_data();

        match data_type {
            ValueDataType::Utf8 => SerializedString::read(field),
            ValueDataType::Utf16le => {
                let (decoded, _, _) = encoding_rs::UTF_16LE.decode(field);
                SerializedString::read(decoded.as_bytes())
            }
        }
    }

    /// Reads a field of hexadecimal digits into a serialized string
    pub fn read_serialized_string_base16(&mut self) -> Result<SerializedString> {
        let data_type = self.data_type;
        let field = self.read_data();
        let narrow = Self::narrow_field(field, data_type)?;

        SerializedString::read_hex(&narrow)
    }

    /// Reads a field and transcodes it to UTF-8
    pub fn read_utf8_string(&mut self) -> Result<String> {
        let data_type = self.data_type;
        let field = self.read_data();

        match data_type {
            ValueDataType::Utf8 => Ok(String::from_utf8_lossy(field).into_owned()),
            ValueDataType::Utf16le => {
                let (decoded, _, _) = encoding_rs::UTF_16LE.decode(field);
                Ok(decoded.into_owned())
            }
        }
    }
}
