//! Codec error types

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NbtError {
    /// Stream ended before the document was complete
    #[error("unexpected end of data: {0}")]
    Truncated(String),

    /// Gzip/deflate layer rejected the bytes
    #[error("corrupt compressed stream: {0}")]
    CorruptStream(String),

    /// Decompressed payload is not a valid tag tree
    #[error("malformed tag structure: {0}")]
    Malformed(String),

    /// Tree cannot be represented in the binary format
    #[error("cannot encode document: {0}")]
    Encode(String),
}

pub type NbtResult<T> = std::result::Result<T, NbtError>;
