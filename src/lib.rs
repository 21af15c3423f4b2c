//! Fibdelta: Fibonacci delta integer compression in Rust.
//!
//! Every non-negative integer is written as the index of its nearest
//! Fibonacci number plus a signed varint offset. Units are self-delimiting,
//! so encoded values concatenate into a stream with no framing overhead.
//!
//! The crate provides:
//! - The codec itself (`codec`)
//! - A reusable codec instance owning the reference table (`engine`)
//! - Whitespace tokenizer and space-joined writer (`text`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use fibdelta::engine::Engine;
//!
//! let engine = Engine::default();
//! let encoded = engine.encode_all([0, 1, 2, 4, 100]);
//! assert_eq!(encoded, [0x00, 0x04, 0x0C, 0x11, 0x01, 0x2D, 0x0B]);
//!
//! let decoded = engine.decode_all(&encoded).unwrap();
//! assert_eq!(decoded, [0, 1, 2, 4, 100]);
//! ```

pub mod codec;
pub mod engine;
pub mod io;
pub mod text;

#[cfg(feature = "cli")]
pub mod cli;
