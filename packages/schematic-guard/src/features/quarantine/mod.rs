//! Quarantine & Rewrite
//!
//! Runs only for documents the sanitizer flagged. Keeps a copy of the upload
//! under `anomaly/<submitter>/`, tells the notifier, then either empties the
//! original (banned content) or atomically replaces it with the pruned tree.

mod notifier;
mod quarantine_manager;

pub use notifier::{anomaly_message, AnomalyNotifier, LogNotifier};
pub use quarantine_manager::{QuarantineAction, QuarantineManager};
