// Variable-length integer encoding for encoded-unit headers and offsets.
//
// Base-128, little-endian: least-significant group first.
// Each byte has bit 7 set except the final byte.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Maximum encoded length for a 64-bit value (ceil(64/7) = 10).
pub const MAX_VARINT_LEN: usize = 10;

/// Shift of the tenth (last possible) group. Only bit 0 of that group fits.
const LAST_GROUP_SHIFT: u32 = 63;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a `u64` as a variable-length integer into `buf`.
/// Returns the number of bytes written (1..=10), stored at `buf[..len]`.
#[inline]
pub fn encode_u64(mut num: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    while num >= 0x80 {
        buf[i] = (num as u8 & 0x7F) | 0x80;
        num >>= 7;
        i += 1;
    }
    buf[i] = num as u8;
    i + 1
}

/// Encode a `u64` and write to a `Write` sink. Returns the byte count.
pub fn write_u64<W: Write>(w: &mut W, num: u64) -> io::Result<usize> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u64(num, &mut buf);
    w.write_all(&buf[..len])?;
    Ok(len)
}

/// Encode a `u64` into a fresh `Vec`.
pub fn to_vec(num: u64) -> Vec<u8> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u64(num, &mut buf);
    buf[..len].to_vec()
}

// ---------------------------------------------------------------------------
// Decoding from byte slices
// ---------------------------------------------------------------------------

/// Fold one byte into the accumulator. Returns `Ok(true)` on the final group.
#[inline]
fn accumulate(val: &mut u64, shift: &mut u32, byte: u8) -> Result<bool, VarIntError> {
    let group = u64::from(byte & 0x7F);
    if *shift > LAST_GROUP_SHIFT || (*shift == LAST_GROUP_SHIFT && group > 1) {
        return Err(VarIntError::Overflow);
    }
    *val |= group << *shift;
    *shift += 7;
    Ok(byte & 0x80 == 0)
}

/// Decode a `u64` from a byte slice.
/// Returns `(value, bytes_consumed)` or an error.
pub fn read_u64(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut val: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in data.iter().enumerate() {
        if accumulate(&mut val, &mut shift, byte)? {
            return Ok((val, i + 1));
        }
    }
    Err(VarIntError::Underflow)
}

// ---------------------------------------------------------------------------
// Decoding from `Read` (streaming)
// ---------------------------------------------------------------------------

/// Read one byte, mapping a clean end of input to `None`.
fn read_byte<R: Read>(r: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    match r.read_exact(&mut buf) {
        Ok(()) => Ok(Some(buf[0])),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read a `u64` varint from a streaming source.
///
/// Returns `Ok(None)` when the source is already exhausted. A source that
/// ends after the first byte but before the terminating byte is
/// [`VarIntError::Underflow`].
pub fn stream_read_u64<R: Read>(r: &mut R) -> Result<Option<u64>, VarIntError> {
    let mut val: u64 = 0;
    let mut shift = 0u32;
    let mut started = false;
    loop {
        let Some(byte) = read_byte(r)? else {
            return if started {
                Err(VarIntError::Underflow)
            } else {
                Ok(None)
            };
        };
        started = true;
        if accumulate(&mut val, &mut shift, byte)? {
            return Ok(Some(val));
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Return the encoded byte-length of a `u64` value.
#[inline]
pub fn sizeof_u64(num: u64) -> usize {
    let bits = 64 - num.leading_zeros();
    bits.max(1).div_ceil(7) as usize
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum VarIntError {
    /// Not enough input bytes to complete the integer.
    #[error("varint underflow (truncated input)")]
    Underflow,
    /// Value would overflow a `u64` (or exceeds the 10-group limit).
    #[error("varint overflow")]
    Overflow,
    /// The underlying reader failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
