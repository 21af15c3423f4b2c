// Fibonacci delta codec.
//
// Each value is written as the index of its nearest Fibonacci reference,
// a 2-bit operation, and (unless the hit is exact) a varint offset.
//
// # Modules
//
// - `table`:   Fibonacci reference table and nearest-reference selection
// - `varint`:  Variable-length integer encoding (base-128, little-endian)
// - `unit`:    Encoded unit header packing and reconstruction
// - `encoder`: Value to unit framing, streaming encoder
// - `decoder`: Unit parsing, streaming decoder

pub mod decoder;
pub mod encoder;
pub mod table;
pub mod unit;
pub mod varint;

// Re-export key types for convenience.
pub use decoder::{DecodeError, StreamDecoder, decode_memory};
pub use encoder::StreamEncoder;
pub use table::{DEFAULT_TABLE_LEN, MAX_TABLE_LEN, MIN_TABLE_LEN, ReferenceTable, TableError};
pub use unit::{EncodedUnit, Op};
pub use varint::VarIntError;
