//! Named Binary Tag documents
//!
//! Gzip-wrapped, big-endian tag trees as written by Java-edition structure
//! exports. The rest of the crate depends only on [`DocumentCodec`].

pub mod domain;
mod error;
pub mod infrastructure;
pub mod ports;

pub use domain::{NbtCompound, NbtDocument, NbtList, Tag, TagId};
pub use error::{NbtError, NbtResult};
pub use infrastructure::GzipNbtCodec;
pub use ports::DocumentCodec;
