// File-level I/O helpers for integer compression.
//
// Provides `compress_file()` and `decompress_file()` convenience functions
// that wrap the streaming codec with buffered I/O, plus the `*_stream`
// forms that work on any reader/writer pair.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::codec::decoder::{DecodeError, StreamDecoder};
use crate::codec::encoder::StreamEncoder;
use crate::engine::Engine;
use crate::text::{JoinWriter, Tokens};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `compress_stream()` / `compress_file()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressStats {
    /// Integers encoded.
    pub values: u64,
    /// Tokens discarded because they were not non-negative integers.
    pub skipped_tokens: u64,
    /// Values equal to a reference (no offset group).
    pub exact_hits: u64,
    /// Values above the largest reference.
    pub clamped: u64,
    /// Text bytes read.
    pub input_bytes: u64,
    /// Encoded bytes written.
    pub output_bytes: u64,
}

/// Statistics returned by `decompress_stream()` / `decompress_file()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecompressStats {
    /// Integers decoded.
    pub values: u64,
    /// Encoded bytes read.
    pub input_bytes: u64,
    /// Text bytes written.
    pub output_bytes: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file I/O operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The encoded stream is malformed.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

/// Tokenize text from `reader` and write the encoded stream to `writer`.
pub fn compress_stream<R: BufRead, W: Write>(
    engine: &Engine,
    reader: R,
    writer: W,
) -> Result<CompressStats, IoError> {
    let mut tokens = Tokens::new(reader);
    let mut encoder = StreamEncoder::new(writer, engine.table());

    for n in tokens.by_ref() {
        encoder.write_value(n)?;
    }
    if let Some(e) = tokens.take_error() {
        return Err(e.into());
    }

    let stats = CompressStats {
        values: encoder.values(),
        skipped_tokens: tokens.skipped(),
        exact_hits: encoder.exact_hits(),
        clamped: encoder.clamped(),
        input_bytes: tokens.bytes_read(),
        output_bytes: encoder.bytes_out(),
    };
    encoder.finish()?;
    Ok(stats)
}

/// Decode the stream from `reader` and write space-joined text to `writer`.
///
/// Stops at the first malformed unit; text already written stays written.
pub fn decompress_stream<R: Read, W: Write>(
    engine: &Engine,
    reader: R,
    writer: W,
) -> Result<DecompressStats, IoError> {
    let mut counting = CountingReader {
        inner: reader,
        count: 0,
    };
    let mut out = JoinWriter::new(writer);

    let mut decoder = StreamDecoder::new(&mut counting, engine.table());
    for value in decoder.by_ref() {
        out.write_value(value?)?;
    }
    let values = decoder.values_decoded();

    let stats = DecompressStats {
        values,
        input_bytes: counting.count,
        output_bytes: out.bytes_written(),
    };
    out.finish()?;
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Compress a text file of integers into `output_path`.
///
/// The output is flushed and synced to disk before returning.
pub fn compress_file(
    engine: &Engine,
    input_path: &Path,
    output_path: &Path,
) -> Result<CompressStats, IoError> {
    let reader = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);

    let stats = compress_stream(engine, reader, &mut writer)?;
    sync(writer)?;

    log::debug!(
        "compressed {}: {} values ({} skipped), {} -> {} bytes",
        input_path.display(),
        stats.values,
        stats.skipped_tokens,
        stats.input_bytes,
        stats.output_bytes
    );
    Ok(stats)
}

/// Decompress an encoded file into a space-joined text file.
pub fn decompress_file(
    engine: &Engine,
    input_path: &Path,
    output_path: &Path,
) -> Result<DecompressStats, IoError> {
    let reader = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);

    let stats = decompress_stream(engine, reader, &mut writer)?;
    sync(writer)?;

    log::debug!(
        "decompressed {}: {} values, {} -> {} bytes",
        input_path.display(),
        stats.values,
        stats.input_bytes,
        stats.output_bytes
    );
    Ok(stats)
}

fn sync(writer: BufWriter<File>) -> io::Result<()> {
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

// ---------------------------------------------------------------------------
// Counting reader
// ---------------------------------------------------------------------------

struct CountingReader<R: Read> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
