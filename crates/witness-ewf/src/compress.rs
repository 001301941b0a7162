//! zlib compression wrapper for chunk and section data

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use witness_core::{CompressionLevel, Error, Result};

/// Upper bound on how far [`decompress`] will grow its output buffer.
/// Guards against decompression bombs in corrupt segment files.
const MAXIMUM_DECOMPRESSED_SIZE: usize = 1 << 30;

/// Outcome of a decompression attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unpacked {
    /// The stream decompressed cleanly
    Ok,
    /// The stream is corrupt; the output buffer has been cleared
    CorruptData,
}

/// Worst-case zlib-compressed size for `size` input bytes
fn compress_bound(size: usize) -> usize {
    size + (size >> 12) + (size >> 14) + (size >> 25) + 13
}

/// Compresses `src` into `dst` as a zlib-wrapped DEFLATE stream.
///
/// `dst` is cleared first and filled up to its capacity; if the capacity
/// turns out too small the buffer is grown once to the worst-case bound and
/// the compression restarted.
pub fn compress(dst: &mut Vec<u8>, src: &[u8], level: CompressionLevel) -> Result<()> {
    fn attempt(dst: &mut Vec<u8>, src: &[u8], compression: Compression) -> Result<bool> {
        dst.clear();

        let mut compressor = Compress::new(compression, true);

        match compressor.compress_vec(src, dst, FlushCompress::Finish) {
            Ok(Status::StreamEnd) => Ok(true),
            Ok(_) => Ok(false),
            Err(error) => Err(Error::Compress(error.to_string())),
        }
    }
    let compression = Compression::new(level.zlib_level());

    if attempt(dst, src, compression)? {
        return Ok(());
    }
    let bound = compress_bound(src.len());
    if dst.capacity() < bound {
        dst.reserve(bound - dst.len());
    }
    if attempt(dst, src, compression)? {
        return Ok(());
    }
    Err(Error::Compress(
        "output buffer exhausted after resize".to_string(),
    ))
}

/// Decompresses the zlib stream `src` into `dst`.
///
/// Three outcomes are distinguished: success, corrupt input data
/// ([`Unpacked::CorruptData`], with `dst` cleared) and hard failure. When
/// the output buffer fills up before the stream ends it is doubled and the
/// decompression restarted.
pub fn decompress(dst: &mut Vec<u8>, src: &[u8]) -> Result<Unpacked> {
    loop {
        dst.clear();

        let mut decompressor = Decompress::new(true);

        match decompressor.decompress_vec(src, dst, FlushDecompress::Finish) {
            Ok(Status::StreamEnd) => return Ok(Unpacked::Ok),
            Ok(_) => {
                if dst.len() < dst.capacity() {
                    // Output space was not the limit: the stream is truncated.
                    dst.clear();
                    return Ok(Unpacked::CorruptData);
                }
                let doubled = (dst.capacity() * 2).max(64);
                if doubled > MAXIMUM_DECOMPRESSED_SIZE {
                    return Err(Error::Decompress(
                        "decompressed data exceeds maximum supported size".to_string(),
                    ));
                }
                dst.reserve(doubled - dst.len());
            }
            Err(error) => {
                if error.needs_dictionary().is_some() {
                    return Err(Error::Decompress("stream requires a preset dictionary".to_string()));
                }
                dst.clear();
                return Ok(Unpacked::CorruptData);
            }
        }
    }
}
