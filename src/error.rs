//! Error types for ChitraMap

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Decode and render errors.
///
/// Every variant is recoverable: [`crate::decode_map`] converts any of them
/// into an empty snapshot carrying the error text.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Read past the end of the buffer
    #[error(
        "error parsing {section}.{field} at offset {offset:#x}: buffer underrun \
         (needed {needed}, remaining {remaining})"
    )]
    BufferUnderrun {
        /// Section being parsed when the read failed
        section: String,
        /// Field being read
        field: String,
        /// Absolute offset of the failed read
        offset: usize,
        /// Bytes requested
        needed: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// Malformed or truncated header
    #[error("Header parse error: {0}")]
    HeaderParse(String),

    /// Recognized frame/version tag that is not supported
    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(String),

    /// Corrupt compressed payload
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// Malformed JSON section
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed base64 payload
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid render configuration
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigLoadError),
}

impl Error {
    /// Short message suitable for the empty-map placeholder
    pub fn placeholder_text(&self) -> &'static str {
        match self {
            Error::UnsupportedFrame(_) => "UNSUPPORTED MAP",
            Error::Decompression(_) | Error::Base64(_) => "CORRUPT MAP",
            _ => "FAILED TO PARSE MAP",
        }
    }
}
