// Encoder: nearest-reference selection and unit framing.
//
// Units are self-delimiting, so a stream is just units written back to back.

use std::io::{self, Write};

use super::table::ReferenceTable;
use super::unit::{EncodedUnit, Op};

/// Encode one value into a fresh buffer.
pub fn encode(n: u64, table: &ReferenceTable) -> Vec<u8> {
    let unit = plan(n, table);
    let mut out = Vec::with_capacity(unit.encoded_len());
    unit.extend_into(&mut out);
    out
}

/// Pick the encoded unit for `n`.
#[inline]
pub fn plan(n: u64, table: &ReferenceTable) -> EncodedUnit {
    let unit = EncodedUnit::plan(n, table);
    if n > table.last() {
        log::trace!("value {n} exceeds largest reference, clamped to index {}", unit.index);
    }
    unit
}

/// Encode one value into `w`. Returns the number of bytes written.
pub fn encode_to<W: Write>(w: &mut W, n: u64, table: &ReferenceTable) -> io::Result<usize> {
    plan(n, table).write_to(w)
}

/// Encode a sequence of values as one concatenated stream.
pub fn encode_all<I>(values: I, table: &ReferenceTable) -> Vec<u8>
where
    I: IntoIterator<Item = u64>,
{
    let mut out = Vec::new();
    for n in values {
        plan(n, table).extend_into(&mut out);
    }
    out
}

// ---------------------------------------------------------------------------
// Streaming encoder
// ---------------------------------------------------------------------------

/// Streaming encoder writing units to any `impl Write`.
///
/// Tracks how many values and bytes went through, plus how many values
/// landed exactly on a reference or had to be clamped.
pub struct StreamEncoder<'t, W: Write> {
    writer: W,
    table: &'t ReferenceTable,
    values: u64,
    bytes_out: u64,
    exact_hits: u64,
    clamped: u64,
}

impl<'t, W: Write> StreamEncoder<'t, W> {
    pub fn new(writer: W, table: &'t ReferenceTable) -> Self {
        Self {
            writer,
            table,
            values: 0,
            bytes_out: 0,
            exact_hits: 0,
            clamped: 0,
        }
    }

    /// Encode and write one value.
    pub fn write_value(&mut self, n: u64) -> io::Result<usize> {
        let unit = plan(n, self.table);
        let written = unit.write_to(&mut self.writer)?;
        self.values += 1;
        self.bytes_out += written as u64;
        if unit.op == Op::Exact {
            self.exact_hits += 1;
        } else if n > self.table.last() {
            self.clamped += 1;
        }
        Ok(written)
    }

    pub fn values(&self) -> u64 {
        self.values
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    pub fn exact_hits(&self) -> u64 {
        self.exact_hits
    }

    /// Values above the largest reference.
    pub fn clamped(&self) -> u64 {
        self.clamped
    }

    /// Flush and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
