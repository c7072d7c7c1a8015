//! Document Loader
//!
//! Reads a schematic under a shared advisory lock, checks the container
//! header and hands the bytes to the codec. Failures come back classified:
//! `LockUnavailable` / `TruncatedOrCorruptStream` are worth retrying,
//! `InvalidFormat` is not.

mod document_loader;
mod shared_lock;

pub use document_loader::{
    validate_header, DocumentLoader, DocumentSource, GZIP_MAGIC, MIN_DOCUMENT_BYTES,
};
