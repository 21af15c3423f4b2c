// Decoder: unit parsing and value reconstruction.
//
// A decode attempt that starts at a unit boundary with no bytes left is the
// normal end of the stream (`Ok(None)`). Anything that starts a unit but
// cannot finish it is malformed, and byte alignment is lost from there on.

use std::io::{self, Read};

use thiserror::Error;

use super::table::ReferenceTable;
use super::unit::{self, EncodedUnit, Op};
use super::varint::{self, VarIntError};

// ---------------------------------------------------------------------------
// Decoder error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("truncated unit header")]
    TruncatedHeader,
    #[error("missing offset after {op} header at index {index}")]
    MissingOffset { index: usize, op: Op },
    #[error("reference index {index} out of range (table has {len} entries)")]
    IndexOutOfRange { index: u64, len: usize },
    #[error("reserved opcode 3 at index {index}")]
    ReservedOpcode { index: u64 },
    #[error("varint overflow")]
    VarIntOverflow,
    #[error("{op} offset {offset} from reference index {index} leaves the u64 range")]
    ValueOutOfRange { index: usize, op: Op, offset: u64 },
}

impl DecodeError {
    /// True for every corrupted-stream condition; false for reader failures.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Map a varint failure while reading a unit header.
fn header_error(e: VarIntError) -> DecodeError {
    match e {
        VarIntError::Underflow => DecodeError::TruncatedHeader,
        VarIntError::Overflow => DecodeError::VarIntOverflow,
        VarIntError::Io(e) => DecodeError::Io(e),
    }
}

// ---------------------------------------------------------------------------
// Unit parsing
// ---------------------------------------------------------------------------

/// Read the next unit without resolving it.
///
/// Returns `Ok(None)` at a clean end of stream.
pub fn read_unit<R: Read>(
    r: &mut R,
    table: &ReferenceTable,
) -> Result<Option<EncodedUnit>, DecodeError> {
    let Some(header) = varint::stream_read_u64(r).map_err(header_error)? else {
        return Ok(None);
    };

    let (raw_index, opcode) = unit::split_header(header);
    if raw_index >= table.len() as u64 {
        return Err(DecodeError::IndexOutOfRange {
            index: raw_index,
            len: table.len(),
        });
    }
    let index = raw_index as usize;
    let op = Op::from_opcode(opcode).ok_or(DecodeError::ReservedOpcode { index: raw_index })?;

    if op == Op::Exact {
        return Ok(Some(EncodedUnit {
            index,
            op,
            offset: 0,
        }));
    }

    let offset = match varint::stream_read_u64(r) {
        Ok(Some(offset)) => offset,
        Ok(None) | Err(VarIntError::Underflow) => {
            return Err(DecodeError::MissingOffset { index, op });
        }
        Err(VarIntError::Overflow) => return Err(DecodeError::VarIntOverflow),
        Err(VarIntError::Io(e)) => return Err(DecodeError::Io(e)),
    };

    Ok(Some(EncodedUnit { index, op, offset }))
}

/// Decode the next value from `r`.
///
/// Returns `Ok(None)` at a clean end of stream.
pub fn decode<R: Read>(r: &mut R, table: &ReferenceTable) -> Result<Option<u64>, DecodeError> {
    let Some(unit) = read_unit(r, table)? else {
        return Ok(None);
    };
    unit.resolve(table)
        .map(Some)
        .ok_or(DecodeError::ValueOutOfRange {
            index: unit.index,
            op: unit.op,
            offset: unit.offset,
        })
}

// ---------------------------------------------------------------------------
// Streaming decoder
// ---------------------------------------------------------------------------

/// Iterator over the values of an encoded stream.
///
/// Yields `Err` at most once; after a malformed unit the stream is fused.
pub struct StreamDecoder<'t, R: Read> {
    reader: R,
    table: &'t ReferenceTable,
    values_decoded: u64,
    done: bool,
}

impl<'t, R: Read> StreamDecoder<'t, R> {
    pub fn new(reader: R, table: &'t ReferenceTable) -> Self {
        Self {
            reader,
            table,
            values_decoded: 0,
            done: false,
        }
    }

    /// Number of values decoded so far.
    pub fn values_decoded(&self) -> u64 {
        self.values_decoded
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for StreamDecoder<'_, R> {
    type Item = Result<u64, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match decode(&mut self.reader, self.table) {
            Ok(Some(value)) => {
                self.values_decoded += 1;
                Some(Ok(value))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                log::warn!(
                    "decode aborted after {} values: {e}",
                    self.values_decoded
                );
                Some(Err(e))
            }
        }
    }
}

/// Decode a whole in-memory stream.
pub fn decode_memory(data: &[u8], table: &ReferenceTable) -> Result<Vec<u64>, DecodeError> {
    StreamDecoder::new(data, table).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
