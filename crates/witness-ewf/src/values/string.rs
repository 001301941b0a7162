//! Owned strings deserialized from logical evidence file entries

use witness_core::{Error, Result};

/// A flat UTF-8 string read from serialized entry data.
///
/// An unset string (no data, or hexadecimal data that was all zeros) is
/// represented by an empty buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializedString {
    data: Vec<u8>,
}

impl SerializedString {
    /// Reads a string from raw UTF-8 data, tolerating one trailing NUL
    pub fn read(data: &[u8]) -> Result<Self> {
        let data = match data.last() {
            Some(0) => &data[..data.len() - 1],
            _ => data,
        };
        Ok(SerializedString {
            data: data.to_vec(),
        })
    }

    /// Reads a hexadecimal string, normalizing to lower case.
    ///
    /// Only `[0-9A-Fa-f]` is accepted. Input consisting entirely of ASCII
    /// `'0'` means the value was never set and produces an unset string.
    pub fn read_hex(data: &[u8]) -> Result<Self> {
        let data = match data.last() {
            Some(0) => &data[..data.len() - 1],
            _ => data,
        };
        let mut normalized = Vec::with_capacity(data.len());
        let mut zero_values_only = true;

        for &byte in data {
            if byte != b'0' {
                zero_values_only = false;
            }
            match byte {
                b'0'..=b'9' | b'a'..=b'f' => normalized.push(byte),
                b'A'..=b'F' => normalized.push(byte + (b'a' - b'A')),
                _ => {
                    return Err(Error::unsupported(
                        "unsupported character in hexadecimal string",
                    ))
                }
            }
        }
        if zero_values_only {
            normalized.clear();
        }
        Ok(SerializedString { data: normalized })
    }

    /// True if the string holds data
    pub fn is_set(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copies the string out as UTF-8, replacing invalid sequences
    pub fn to_utf8(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Copies the string out as UTF-16 code units, replacing invalid
    /// sequences rather than failing on lone surrogates
    pub fn to_utf16(&self) -> Vec<u16> {
        String::from_utf8_lossy(&self.data).encode_utf16().collect()
    }
}
