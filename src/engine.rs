// Codec engine: one reference table plus the high-level encode/decode API.
//
// The table is built once in `Engine::new` and shared read-only by every
// call, so an `Engine` can be used from many threads without locking.

use std::io::Read;

use crate::codec::decoder::{self, DecodeError};
use crate::codec::encoder;
use crate::codec::table::{DEFAULT_TABLE_LEN, ReferenceTable, TableError};
use crate::codec::unit::EncodedUnit;

// ---------------------------------------------------------------------------
// Engine options
// ---------------------------------------------------------------------------

/// Configuration for the codec engine.
///
/// Encoder and decoder must agree on `table_len`; the stream carries no
/// header that would record it.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Number of Fibonacci references (2..=94).
    pub table_len: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            table_len: DEFAULT_TABLE_LEN,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Engine {
    table: ReferenceTable,
}

impl Engine {
    pub fn new(opts: EngineOptions) -> Result<Self, TableError> {
        let table = ReferenceTable::new(opts.table_len)?;
        log::debug!(
            "engine: {} references, largest {}",
            table.len(),
            table.last()
        );
        Ok(Self { table })
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    /// Encode one value.
    pub fn encode(&self, n: u64) -> Vec<u8> {
        encoder::encode(n, &self.table)
    }

    /// Unit that `encode` would emit for `n`.
    pub fn plan(&self, n: u64) -> EncodedUnit {
        encoder::plan(n, &self.table)
    }

    /// Encode a sequence into one concatenated stream.
    pub fn encode_all<I>(&self, values: I) -> Vec<u8>
    where
        I: IntoIterator<Item = u64>,
    {
        encoder::encode_all(values, &self.table)
    }

    /// Encode values in parallel. Output is identical to `encode_all`.
    #[cfg(feature = "parallel")]
    pub fn encode_all_par(&self, values: &[u64]) -> Vec<u8> {
        use rayon::prelude::*;

        let chunks: Vec<Vec<u8>> = values
            .par_chunks(4096)
            .map(|chunk| self.encode_all(chunk.iter().copied()))
            .collect();
        chunks.concat()
    }

    /// Decode the next value from `r`. `Ok(None)` means the stream ended
    /// cleanly at a unit boundary.
    pub fn decode<R: Read>(&self, r: &mut R) -> Result<Option<u64>, DecodeError> {
        decoder::decode(r, &self.table)
    }

    /// Decode a whole in-memory stream.
    pub fn decode_all(&self, data: &[u8]) -> Result<Vec<u64>, DecodeError> {
        decoder::decode_memory(data, &self.table)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(engine: &Engine, values: &[u64]) {
        let data = engine.encode_all(values.iter().copied());
        let decoded = engine.decode_all(&data).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn default_engine_roundtrip() {
        let engine = Engine::default();
        roundtrip(&engine, &[0, 1, 2, 4, 100]);
        roundtrip(&engine, &[u64::MAX, 0, 7_540_113_804_746_346_429, 12345]);
        roundtrip(&engine, &[]);
    }

    #[test]
    fn custom_table_len() {
        let engine = Engine::new(EngineOptions { table_len: 20 }).unwrap();
        assert_eq!(engine.table().len(), 20);
        roundtrip(&engine, &[1_000_000, 3, 4181, 4182]);
    }

    #[test]
    fn invalid_table_len() {
        assert!(Engine::new(EngineOptions { table_len: 1 }).is_err());
        assert!(Engine::new(EngineOptions { table_len: 95 }).is_err());
    }

    #[test]
    fn decode_one_at_a_time() {
        let engine = Engine::default();
        let data = engine.encode_all([9, 10, 11]);
        let mut src: &[u8] = &data;
        assert_eq!(engine.decode(&mut src).unwrap(), Some(9));
        assert_eq!(engine.decode(&mut src).unwrap(), Some(10));
        assert_eq!(engine.decode(&mut src).unwrap(), Some(11));
        assert_eq!(engine.decode(&mut src).unwrap(), None);
    }

    #[test]
    fn mismatched_table_len_is_detected() {
        let wide = Engine::default();
        let narrow = Engine::new(EngineOptions { table_len: 10 }).unwrap();
        let data = wide.encode(4181);
        assert!(matches!(
            narrow.decode_all(&data),
            Err(DecodeError::IndexOutOfRange { index: 19, len: 10 })
        ));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let engine = Engine::default();
        let values: Vec<u64> = (0..20_000u64).map(|i| i * 7919).collect();
        assert_eq!(
            engine.encode_all_par(&values),
            engine.encode_all(values.iter().copied())
        );
    }
}
