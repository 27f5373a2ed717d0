//! Byte-level input handling.
//!
//! - [`ByteReader`]: bounds-checked little-endian cursor
//! - [`unpack`]: gzip / zlib / base64 envelopes around vendor payloads

mod reader;
pub mod unpack;

pub use reader::ByteReader;
