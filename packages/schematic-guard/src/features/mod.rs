//! Feature modules (vertical slices)

pub mod file_watcher;
pub mod loader;
pub mod nbt;
pub mod processor;
pub mod quarantine;
pub mod sanitizer;
