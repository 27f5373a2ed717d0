//! Payload unpacking: gzip, zlib and URL-safe base64.

use std::io::Read;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};

use crate::error::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// URL-safe alphabet, padding optional
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Inflate a gzip stream
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decompression(format!("gzip: {}", e)))?;
    Ok(out)
}

/// Inflate a zlib stream
pub fn inflate_zlib(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decompression(format!("zlib: {}", e)))?;
    Ok(out)
}

/// Inflate gzip or zlib depending on the stream header.
///
/// Data that carries neither header is returned unchanged.
pub fn inflate_auto(data: &[u8]) -> Result<Vec<u8>> {
    if data.starts_with(&GZIP_MAGIC) {
        return gunzip(data);
    }
    if data.len() >= 2 && data[0] & 0x0f == 0x08 && u16::from_be_bytes([data[0], data[1]]) % 31 == 0
    {
        return inflate_zlib(data);
    }
    Ok(data.to_vec())
}

/// Decode URL-safe base64 (`-` and `_`), ignoring surrounding whitespace
pub fn decode_urlsafe_base64(text: &[u8]) -> Result<Vec<u8>> {
    let trimmed = text.trim_ascii();
    Ok(URL_SAFE_LENIENT.decode(trimmed)?)
}
