//! Hash value codecs
//!
//! Digests live in two on-disk shapes: the EWFX `xhash` XML section with
//! `md5`/`sha1` tags, and the legacy fixed-size binary hash sections.
//! In-memory hash values are lower-case hex strings under the canonical
//! `MD5` / `SHA1` identifiers.

use md5::{Digest, Md5};
use sha1::Sha1;

use crate::values::table::ValueTable;
use crate::values::xml;
use witness_core::{Error, Result};

/// Maps an xhash tag to its canonical identifier
fn canonical_identifier(tag: &str) -> Option<&'static str> {
    match tag {
        "md5" => Some("MD5"),
        "sha1" => Some("SHA1"),
        _ => None,
    }
}

/// Parses an xhash section into hash values.
///
/// Known tags are stored under their canonical identifiers; unrecognized
/// tags are kept as-is.
pub fn parse_xhash(data: &[u8]) -> Result<ValueTable> {
    let document = xml::decode_document(data);
    let mut hash_values = ValueTable::hash_values();

    for (tag, value) in xml::scan_tags(&document) {
        match canonical_identifier(tag) {
            Some(identifier) => hash_values.set_string(identifier, value)?,
            None => hash_values.set_string(tag, value)?,
        }
    }
    Ok(hash_values)
}

/// Generates an xhash section from hash values, emitting the canonical
/// identifiers as lower-case tags
pub fn generate_xhash(hash_values: &ValueTable) -> Vec<u8> {
    let entries = hash_values.iter_set().map(|(identifier, value)| {
        let tag = String::from_utf8_lossy(identifier).to_lowercase();
        (tag, std::str::from_utf8(value).unwrap_or(""))
    });
    xml::generate_document("xhash", entries)
}

/// Stores a 16-byte binary MD5 section as the `MD5` hash value
pub fn parse_md5(hash_values: &mut ValueTable, data: &[u8]) -> Result<()> {
    if data.len() != 16 {
        return Err(Error::invalid_argument(format!(
            "MD5 hash section is {} bytes, expected 16",
            data.len()
        )));
    }
    hash_values.set(b"MD5", hex::encode(data).as_bytes())
}

/// Stores a 20-byte binary SHA1 section as the `SHA1` hash value
pub fn parse_sha1(hash_values: &mut ValueTable, data: &[u8]) -> Result<()> {
    if data.len() != 20 {
        return Err(Error::invalid_argument(format!(
            "SHA1 hash section is {} bytes, expected 20",
            data.len()
        )));
    }
    hash_values.set(b"SHA1", hex::encode(data).as_bytes())
}

fn generate_digest<const N: usize>(hash_values: &ValueTable, identifier: &[u8]) -> Result<Option<[u8; N]>> {
    let Some(value) = hash_values.get(identifier) else {
        return Ok(None);
    };
    let decoded = hex::decode(value)
        .map_err(|_| Error::invalid_data("hash value is not valid hexadecimal"))?;
    let digest: [u8; N] = decoded.try_into().map_err(|_| {
        Error::out_of_bounds(format!(
            "hash value has the wrong length for a {N}-byte digest"
        ))
    })?;
    Ok(Some(digest))
}

/// Produces the binary MD5 section bytes, if the value is set
pub fn generate_md5(hash_values: &ValueTable) -> Result<Option<[u8; 16]>> {
    generate_digest(hash_values, b"MD5")
}

/// Produces the binary SHA1 section bytes, if the value is set
pub fn generate_sha1(hash_values: &ValueTable) -> Result<Option<[u8; 20]>> {
    generate_digest(hash_values, b"SHA1")
}

/// Streaming MD5 + SHA1 digest over the acquired media bytes.
///
/// Fed chunk by chunk during acquisition and finalized into the hash
/// values once the last chunk is staged.
pub struct MediaDigest {
    md5: Md5,
    sha1: Sha1,
    bytes_processed: u64,
}

impl Default for MediaDigest {
    fn default() -> Self {
        MediaDigest::new()
    }
}

impl MediaDigest {
    pub fn new() -> Self {
        MediaDigest {
            md5: Md5::new(),
            sha1: Sha1::new(),
            bytes_processed: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.sha1.update(data);
        self.bytes_processed += data.len() as u64;
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// Finalizes both digests into the hash values as lower-case hex
    pub fn finalize_into(self, hash_values: &mut ValueTable) -> Result<()> {
        let md5_digest = self.md5.finalize();
        let sha1_digest = self.sha1.finalize();

        hash_values.set(b"MD5", hex::encode(md5_digest).as_bytes())?;
        hash_values.set(b"SHA1", hex::encode(sha1_digest).as_bytes())?;
        Ok(())
    }
}
