//! Ports - codec contract

use super::domain::NbtDocument;
use super::error::NbtResult;

/// Reads and writes whole compressed documents
pub trait DocumentCodec: Send + Sync {
    /// Decompress and parse. Errors are `Truncated`, `CorruptStream` or `Malformed`.
    fn decode(&self, bytes: &[u8]) -> NbtResult<NbtDocument>;

    /// Serialize and compress
    fn encode(&self, document: &NbtDocument) -> NbtResult<Vec<u8>>;
}
