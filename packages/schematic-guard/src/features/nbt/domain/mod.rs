//! Domain - in-memory tag tree

mod tag;

pub use tag::{NbtCompound, NbtDocument, NbtList, Tag, TagId};
