//! EWF dialect Adler-32
//!
//! Uncompressed chunks carry a 4-byte little-endian trailer holding the
//! zlib Adler-32 of the chunk bytes with initial value 1. Compressed chunks
//! carry the same checksum inside the zlib stream trailer instead.

/// The largest prime smaller than 65536
const BASE: u32 = 65521;

/// The largest n such that 255 * n * (n + 1) / 2 + (n + 1) * (BASE - 1) fits in 32 bits
const NMAX: usize = 5552;

/// Calculates the Adler-32 of a buffer, continuing from a previous value.
///
/// Callers use a seed of 1 when forming a self-contained chunk checksum.
/// `adler32(seed, &[])` returns the seed unchanged.
pub fn adler32(seed: u32, data: &[u8]) -> u32 {
    let mut low = seed & 0xffff;
    let mut high = (seed >> 16) & 0xffff;

    for block in data.chunks(NMAX) {
        for &byte in block {
            low += u32::from(byte);
            high += low;
        }
        low %= BASE;
        high %= BASE;
    }
    (high << 16) | low
}

/// Combines two Adler-32 values as if their inputs had been concatenated.
///
/// `second` must have been calculated with the initial value 1;
/// `second_size` is the byte length of its input. For any split of a buffer
/// into `a ++ b`: `adler32(seed, a ++ b) ==
/// adler32_combine(adler32(seed, a), adler32(1, b), b.len())`.
pub fn adler32_combine(first: u32, second: u32, second_size: usize) -> u32 {
    let remainder = (second_size as u64 % u64::from(BASE)) as u32;

    let mut low = first & 0xffff;
    let mut high = (u64::from(remainder) * u64::from(low) % u64::from(BASE)) as u32;

    low += (second & 0xffff) + BASE - 1;
    high += ((first >> 16) & 0xffff) + ((second >> 16) & 0xffff) + BASE - remainder;

    if low >= BASE {
        low -= BASE;
    }
    if low >= BASE {
        low -= BASE;
    }
    if high >= BASE << 1 {
        high -= BASE << 1;
    }
    if high >= BASE {
        high -= BASE;
    }
    (high << 16) | low
}
