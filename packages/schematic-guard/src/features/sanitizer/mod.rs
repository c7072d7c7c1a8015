//! Tree Sanitizer
//!
//! Two independent passes over a parsed document, no I/O:
//! - structural pruning of the reserved attributes slot
//! - banned keyword scan over every string tag

pub mod domain;
mod sanitizer;

pub use domain::{contains_banned_keyword, prune_reserved_slots, SanitizePolicy, SanitizeVerdict};
pub use sanitizer::Sanitizer;
