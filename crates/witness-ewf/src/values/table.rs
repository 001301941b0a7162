//! Typed key/value stores backing the textual metadata sections

use witness_core::{Error, Result};

/// The well-known header value identifiers, in their canonical order
pub const HEADER_VALUE_IDENTIFIERS: [&str; 14] = [
    "case_number",
    "description",
    "examiner_name",
    "evidence_number",
    "notes",
    "acquiry_date",
    "system_date",
    "acquiry_operating_system",
    "acquiry_software_version",
    "password",
    "compression_type",
    "model",
    "serial_number",
    "unknown_dc",
];

/// An insertion-ordered map from byte-string identifiers to UTF-8 values.
///
/// Identifiers can be registered without a value; an empty value is
/// distinct from an unset one. Setting an existing identifier overwrites
/// its value; there is no remove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueTable {
    entries: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl ValueTable {
    pub fn new() -> Self {
        ValueTable::default()
    }

    /// A table pre-registered with the well-known header value identifiers
    pub fn header_values() -> Self {
        let mut table = ValueTable::new();
        for identifier in HEADER_VALUE_IDENTIFIERS {
            table.register(identifier.as_bytes());
        }
        table
    }

    /// A table pre-registered with the MD5 hash value identifier
    pub fn hash_values() -> Self {
        let mut table = ValueTable::new();
        table.register(b"MD5");
        table
    }

    fn position(&self, identifier: &[u8]) -> Option<usize> {
        self.entries.iter().position(|(id, _)| id == identifier)
    }

    /// Registers an identifier without assigning a value.
    /// Registering an existing identifier leaves its value untouched.
    pub fn register(&mut self, identifier: &[u8]) {
        if self.position(identifier).is_none() {
            self.entries.push((identifier.to_vec(), None));
        }
    }

    /// Sets the value for an identifier, registering it if needed
    pub fn set(&mut self, identifier: &[u8], value: &[u8]) -> Result<()> {
        if identifier.is_empty() {
            return Err(Error::invalid_argument("empty value identifier"));
        }
        match self.position(identifier) {
            Some(index) => self.entries[index].1 = Some(value.to_vec()),
            None => self
                .entries
                .push((identifier.to_vec(), Some(value.to_vec()))),
        }
        Ok(())
    }

    /// Convenience for string identifiers and values
    pub fn set_string(&mut self, identifier: &str, value: &str) -> Result<()> {
        self.set(identifier.as_bytes(), value.as_bytes())
    }

    /// The value bytes for an identifier; `None` when absent or unset
    pub fn get(&self, identifier: &[u8]) -> Option<&[u8]> {
        self.position(identifier)
            .and_then(|index| self.entries[index].1.as_deref())
    }

    /// The value as UTF-8 text
    pub fn get_utf8(&self, identifier: &[u8]) -> Option<&str> {
        self.get(identifier)
            .and_then(|value| std::str::from_utf8(value).ok())
    }

    /// The value transcoded to UTF-16
    pub fn get_utf16(&self, identifier: &[u8]) -> Option<Vec<u16>> {
        self.get_utf8(identifier)
            .map(|value| value.encode_utf16().collect())
    }

    /// The number of UTF-16 code units the value transcodes to
    pub fn utf16_size(&self, identifier: &[u8]) -> Option<usize> {
        self.get_utf8(identifier)
            .map(|value| value.encode_utf16().count())
    }

    /// Sets a value supplied as UTF-16 code units
    pub fn set_utf16(&mut self, identifier: &[u8], value: &[u16]) -> Result<()> {
        let decoded = String::from_utf16(value)
            .map_err(|_| Error::invalid_data("value is not valid UTF-16"))?;
        self.set(identifier, decoded.as_bytes())
    }

    /// Number of registered identifiers, set or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The identifier at an insertion-order index
    pub fn identifier_at(&self, index: usize) -> Option<&[u8]> {
        self.entries.get(index).map(|(id, _)| id.as_slice())
    }

    /// The value at an insertion-order index; `None` when unset
    pub fn value_at(&self, index: usize) -> Option<&[u8]> {
        self.entries.get(index).and_then(|(_, value)| value.as_deref())
    }

    /// Iterates `(identifier, value)` pairs over the set values only
    pub fn iter_set(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .filter_map(|(id, value)| value.as_deref().map(|v| (id.as_slice(), v)))
    }
}
