//! Domain - pruning policy, verdict and the pure tree passes

mod passes;
mod policy;

pub use passes::{contains_banned_keyword, prune_reserved_slots};
pub use policy::{SanitizePolicy, SanitizeVerdict};
