// Encoded unit: reference index, operation and optional offset.
//
// Wire layout of one unit:
//
//   varint((index << 2) | opcode)  [varint(offset) if opcode != Exact]

use std::io::{self, Write};

use super::table::ReferenceTable;
use super::varint;

/// Mask for the opcode bits of a unit header.
pub const OPCODE_MASK: u64 = 0x03;

/// Reserved opcode; never emitted, rejected on decode.
pub const OPCODE_RESERVED: u8 = 3;

/// Reconstruction applied to the reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    Exact = 0,
    Add = 1,
    Subtract = 2,
}

impl Op {
    #[inline]
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Map a 2-bit opcode back to an operation. The reserved opcode is `None`.
    #[inline]
    pub fn from_opcode(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Exact),
            1 => Some(Self::Add),
            2 => Some(Self::Subtract),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Exact => "EXACT",
            Self::Add => "ADD",
            Self::Subtract => "SUB",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// One value expressed against the reference table.
///
/// `offset` is always zero for [`Op::Exact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedUnit {
    pub index: usize,
    pub op: Op,
    pub offset: u64,
}

impl EncodedUnit {
    /// Choose the unit for `n`: nearest reference, then the signed offset.
    pub fn plan(n: u64, table: &ReferenceTable) -> Self {
        let index = table.nearest(n);
        let reference = table.as_slice()[index];
        let (op, offset) = if n == reference {
            (Op::Exact, 0)
        } else if n > reference {
            (Op::Add, n - reference)
        } else {
            (Op::Subtract, reference - n)
        };
        Self { index, op, offset }
    }

    /// Packed header: `(index << 2) | opcode`.
    #[inline]
    pub fn header(&self) -> u64 {
        ((self.index as u64) << 2) | u64::from(self.op.opcode())
    }

    /// Whether an offset group follows the header.
    #[inline]
    pub fn has_offset(&self) -> bool {
        self.op != Op::Exact
    }

    /// Value this unit reconstructs, or `None` if it falls outside the
    /// table or outside `u64`.
    pub fn resolve(&self, table: &ReferenceTable) -> Option<u64> {
        let reference = table.get(self.index)?;
        match self.op {
            Op::Exact => Some(reference),
            Op::Add => reference.checked_add(self.offset),
            Op::Subtract => reference.checked_sub(self.offset),
        }
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        let mut len = varint::sizeof_u64(self.header());
        if self.has_offset() {
            len += varint::sizeof_u64(self.offset);
        }
        len
    }

    /// Append the unit to `out`. Returns the number of bytes appended.
    pub fn extend_into(&self, out: &mut Vec<u8>) -> usize {
        let mut buf = [0u8; varint::MAX_VARINT_LEN];
        let mut len = varint::encode_u64(self.header(), &mut buf);
        out.extend_from_slice(&buf[..len]);
        if self.has_offset() {
            let n = varint::encode_u64(self.offset, &mut buf);
            out.extend_from_slice(&buf[..n]);
            len += n;
        }
        len
    }

    /// Write the unit. Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let mut written = varint::write_u64(w, self.header())?;
        if self.has_offset() {
            written += varint::write_u64(w, self.offset)?;
        }
        Ok(written)
    }
}

/// Split a header into `(index, opcode)`.
#[inline]
pub fn split_header(header: u64) -> (u64, u8) {
    (header >> 2, (header & OPCODE_MASK) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_roundtrip() {
        for op in [Op::Exact, Op::Add, Op::Subtract] {
            assert_eq!(Op::from_opcode(op.opcode()), Some(op));
        }
        assert_eq!(Op::from_opcode(OPCODE_RESERVED), None);
    }

    #[test]
    fn plan_exact() {
        let t = ReferenceTable::default();
        let unit = EncodedUnit::plan(13, &t);
        assert_eq!(
            unit,
            EncodedUnit {
                index: 7,
                op: Op::Exact,
                offset: 0
            }
        );
        assert!(!unit.has_offset());
        assert_eq!(unit.encoded_len(), 1);
    }

    #[test]
    fn plan_tie_adds_from_lower() {
        let t = ReferenceTable::default();
        let unit = EncodedUnit::plan(4, &t);
        assert_eq!(unit.index, 4);
        assert_eq!(unit.op, Op::Add);
        assert_eq!(unit.offset, 1);
        assert_eq!(unit.header(), 17);
    }

    #[test]
    fn plan_subtract_from_upper() {
        let t = ReferenceTable::default();
        // 7 is nearer 8 (index 6) than 5.
        let unit = EncodedUnit::plan(7, &t);
        assert_eq!(unit.index, 6);
        assert_eq!(unit.op, Op::Subtract);
        assert_eq!(unit.offset, 1);
        assert_eq!(unit.resolve(&t), Some(7));
    }

    #[test]
    fn plan_clamps_with_add() {
        let t = ReferenceTable::default();
        let unit = EncodedUnit::plan(u64::MAX, &t);
        assert_eq!(unit.index, 92);
        assert_eq!(unit.op, Op::Add);
        assert_eq!(unit.offset, u64::MAX - t.last());
        assert_eq!(unit.resolve(&t), Some(u64::MAX));
    }

    #[test]
    fn header_split() {
        assert_eq!(split_header(17), (4, 1));
        assert_eq!(split_header(0), (0, 0));
        assert_eq!(split_header(u64::MAX), (u64::MAX >> 2, 3));
    }

    #[test]
    fn resolve_rejects_out_of_range() {
        let t = ReferenceTable::new(4).unwrap();
        let past_end = EncodedUnit {
            index: 4,
            op: Op::Exact,
            offset: 0,
        };
        assert_eq!(past_end.resolve(&t), None);

        let below_zero = EncodedUnit {
            index: 3,
            op: Op::Subtract,
            offset: 3,
        };
        assert_eq!(below_zero.resolve(&t), None);

        let overflow = EncodedUnit {
            index: 3,
            op: Op::Add,
            offset: u64::MAX,
        };
        assert_eq!(overflow.resolve(&t), None);
    }

    #[test]
    fn write_matches_encoded_len() {
        let t = ReferenceTable::default();
        for n in [0u64, 4, 100, 12345, u64::MAX] {
            let unit = EncodedUnit::plan(n, &t);
            let mut out = Vec::new();
            let written = unit.write_to(&mut out).unwrap();
            assert_eq!(written, out.len());
            assert_eq!(unit.encoded_len(), out.len());

            let mut appended = vec![0xAA];
            assert_eq!(unit.extend_into(&mut appended), written);
            assert_eq!(&appended[1..], out.as_slice());
        }
    }
}
